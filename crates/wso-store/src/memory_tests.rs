// SPDX-License-Identifier: MIT

use super::*;
use wso_core::{RuntimeType, UserId, WorkshopId};

fn workshop(id: WorkshopId, owner: UserId) -> Workshop {
    Workshop::new(id, "test workshop", "abc123def", 3, owner, RuntimeType::Docker, 1_700_000_000_000)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let store = InMemoryStore::new();
    let id = WorkshopId::new();
    let owner = UserId::new();
    store.create_workshop(workshop(id, owner)).await.unwrap();
    let fetched = store.get_workshop(&id).await.unwrap().unwrap();
    assert_eq!(fetched.id, id);
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let store = InMemoryStore::new();
    let id = WorkshopId::new();
    let owner = UserId::new();
    store.create_workshop(workshop(id, owner)).await.unwrap();
    let err = store.create_workshop(workshop(id, owner)).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn update_status_cas_rejects_stale_expected() {
    let store = InMemoryStore::new();
    let id = WorkshopId::new();
    store.create_workshop(workshop(id, UserId::new())).await.unwrap();

    let ok = store
        .update_workshop_status(&id, WorkshopStatus::Created, WorkshopStatus::Provisioning)
        .await
        .unwrap();
    assert!(ok);

    // Expected status no longer matches (already Provisioning) -> false, not an error.
    let stale = store
        .update_workshop_status(&id, WorkshopStatus::Created, WorkshopStatus::Provisioning)
        .await
        .unwrap();
    assert!(!stale);
}

#[tokio::test]
async fn update_status_unknown_workshop_is_not_found() {
    let store = InMemoryStore::new();
    let err = store
        .update_workshop_status(&WorkshopId::new(), WorkshopStatus::Created, WorkshopStatus::Provisioning)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn create_seats_produces_exactly_n_pending_rows() {
    let store = InMemoryStore::new();
    let id = WorkshopId::new();
    store.create_seats(&id, 3).await.unwrap();
    let seats = store.list_seats(&id).await.unwrap();
    assert_eq!(seats.len(), 3);
    assert!(seats.iter().all(|s| s.status == wso_core::SeatStatus::Pending));
    assert_eq!(seats.iter().map(|s| s.seat_id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn registration_lookup_by_access_code_and_email() {
    let store = InMemoryStore::new();
    let workshop_id = WorkshopId::new();
    let reg = Registration::new(workshop_id, Some("ada@example.com".into()));
    let code = reg.access_code.clone();
    store.create_registration(reg).await.unwrap();

    let by_code = store.get_registration_by_access_code(&code).await.unwrap().unwrap();
    assert_eq!(by_code.access_code, code);

    let by_email = store.get_registration_by_email(&workshop_id, "ada@example.com").await.unwrap().unwrap();
    assert_eq!(by_email.access_code, code);

    assert_eq!(store.count_registrations(&workshop_id).await.unwrap(), 1);
}

#[tokio::test]
async fn list_workshops_filters_by_owner() {
    let store = InMemoryStore::new();
    let owner_a = UserId::new();
    let owner_b = UserId::new();
    store.create_workshop(workshop(WorkshopId::new(), owner_a)).await.unwrap();
    store.create_workshop(workshop(WorkshopId::new(), owner_b)).await.unwrap();

    let all = store.list_workshops(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let filtered = store.list_workshops(Some(owner_a.as_str())).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].owner_id, owner_a);
}
