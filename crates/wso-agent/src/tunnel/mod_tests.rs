// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn wait_for_registration_resolves_once_succeed_is_called() {
    let manager = TunnelManager::new_for_test();
    let waiter = manager.clone();
    let handle = tokio::spawn(async move { waiter.wait_for_registration(Duration::from_secs(2)).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.succeed();

    let result = handle.await.expect("join");
    assert!(result.is_ok());
    assert!(manager.is_registered());
}

#[tokio::test]
async fn wait_for_registration_surfaces_failure_reason() {
    let manager = TunnelManager::new_for_test();
    manager.fail("boom".into());

    let result = manager.wait_for_registration(Duration::from_secs(1)).await;
    assert!(matches!(result, Err(TunnelError::RegistrationFailed(reason)) if reason == "boom"));
}

#[tokio::test]
async fn wait_for_registration_times_out_when_never_signaled() {
    let manager = TunnelManager::new_for_test();
    let result = manager.wait_for_registration(Duration::from_millis(30)).await;
    assert!(matches!(result, Err(TunnelError::WaitTimedOut)));
}

#[tokio::test]
async fn succeed_after_fail_does_not_override_the_first_outcome() {
    let manager = TunnelManager::new_for_test();
    manager.fail("first".into());
    manager.succeed();

    let result = manager.wait_for_registration(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(TunnelError::RegistrationFailed(reason)) if reason == "first"));
}

#[tokio::test]
async fn stop_is_idempotent_and_marks_the_manager_finished() {
    let manager = TunnelManager::new_for_test();
    manager.stop().await;
    manager.stop().await;

    let result = manager.wait_for_registration(Duration::from_millis(50)).await;
    assert!(result.is_err());
}
