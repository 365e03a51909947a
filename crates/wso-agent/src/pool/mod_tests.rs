// SPDX-License-Identifier: MIT

use super::*;
use std::sync::Arc;

fn pool() -> (MicroVmPool, MockVmLauncher) {
    let launcher = MockVmLauncher::new();
    let pool = MicroVmPool::new("192.168.100.1/24", Arc::new(launcher.clone()));
    (pool, launcher)
}

#[test]
fn seat_ip_is_deterministic_and_offset_by_ten() {
    assert_eq!(seat_ip("192.168.100.1/24", 1).as_deref(), Some("192.168.100.11"));
    assert_eq!(seat_ip("192.168.100.1/24", 5).as_deref(), Some("192.168.100.15"));
}

#[test]
fn seat_ip_is_injective_across_a_full_capacity_range() {
    let mut seen = std::collections::HashSet::new();
    for seat_id in 1..=50 {
        let ip = seat_ip("192.168.100.1/24", seat_id).expect("addressable within default capacity");
        assert!(seen.insert(ip), "seat_id {seat_id} collided with an earlier seat");
    }
}

#[test]
fn seat_ip_returns_none_past_the_subnet_ceiling() {
    assert_eq!(seat_ip("192.168.100.1/24", 250), None);
}

#[test]
fn seat_ip_rejects_malformed_bridge_address() {
    assert_eq!(seat_ip("not-an-ip", 1), None);
}

#[tokio::test]
async fn create_then_list_returns_the_new_instance() {
    let (pool, _launcher) = pool();
    let instance = pool.create("wsh-1", 1, CreateSpec::default()).await.expect("create succeeds");
    assert_eq!(instance.ip, "192.168.100.11");
    let listed = pool.list(Some("wsh-1"));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].seat_id, 1);
}

#[tokio::test]
async fn duplicate_create_is_rejected_as_conflict() {
    let (pool, _launcher) = pool();
    pool.create("wsh-1", 1, CreateSpec::default()).await.unwrap();
    let err = pool.create("wsh-1", 1, CreateSpec::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn failed_boot_rolls_back_the_reserved_slot() {
    let (pool, launcher) = pool();
    launcher.set_fail_boot(true);
    let err = pool.create("wsh-1", 1, CreateSpec::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    assert!(pool.is_empty());

    // and a retry after the launcher recovers succeeds cleanly, proving the
    // rollback didn't leave a dangling reservation behind.
    launcher.set_fail_boot(false);
    pool.create("wsh-1", 1, CreateSpec::default()).await.expect("retry after recovery succeeds");
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn destroy_missing_vm_is_not_found() {
    let (pool, _launcher) = pool();
    let err = pool.destroy("wsh-1", 1).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn destroy_removes_the_instance_and_tears_down_the_launcher() {
    let (pool, launcher) = pool();
    pool.create("wsh-1", 3, CreateSpec::default()).await.unwrap();
    assert!(launcher.is_booted("wsh-1", 3));

    pool.destroy("wsh-1", 3).await.unwrap();
    assert!(pool.get("wsh-1", 3).is_none());
    assert!(!launcher.is_booted("wsh-1", 3));
}

#[tokio::test]
async fn list_without_a_workshop_filter_returns_every_instance_sorted() {
    let (pool, _launcher) = pool();
    pool.create("wsh-2", 1, CreateSpec::default()).await.unwrap();
    pool.create("wsh-1", 2, CreateSpec::default()).await.unwrap();
    pool.create("wsh-1", 1, CreateSpec::default()).await.unwrap();

    let all = pool.list(None);
    let keys: Vec<(&str, u32)> = all.iter().map(|i| (i.workshop_id.as_str(), i.seat_id)).collect();
    assert_eq!(keys, vec![("wsh-1", 1), ("wsh-1", 2), ("wsh-2", 1)]);
}

#[tokio::test]
async fn get_ip_reflects_the_seat_ip_function() {
    let (pool, _launcher) = pool();
    pool.create("wsh-1", 4, CreateSpec::default()).await.unwrap();
    assert_eq!(pool.get_ip("wsh-1", 4).as_deref(), Some("192.168.100.14"));
    assert_eq!(pool.get_ip("wsh-1", 99), None);
}
