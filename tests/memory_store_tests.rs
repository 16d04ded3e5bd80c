//! Conditional semantics of the in-memory store: every `tx_*` guard must
//! hold atomically or leave all records unchanged.

use chrono::Utc;
use events_backend::models::{Event, Registration, RegistrationStatus, User};
use events_backend::store::{EventStore, MemoryStore, StoreError};
use pretty_assertions::assert_eq;

fn user(id: &str) -> User {
    User::new(id.to_string(), format!("User {id}"))
}

fn event(id: &str, capacity: i32, waitlist_enabled: bool) -> Event {
    let now = Utc::now();
    Event {
        event_id: id.to_string(),
        title: Some(format!("Event {id}")),
        description: None,
        date: None,
        location: None,
        organizer: None,
        status: "active".to_string(),
        capacity,
        registered_count: 0,
        waitlist_enabled,
        waitlist: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn registration(user_id: &str, ev: &Event, status: RegistrationStatus) -> Registration {
    Registration::new(user_id.to_string(), status, ev)
}

#[tokio::test]
async fn put_user_if_absent_rejects_duplicates() {
    let store = MemoryStore::new();
    store.put_user_if_absent(user("u1")).await.unwrap();
    let err = store.put_user_if_absent(user("u1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn register_confirmed_enforces_capacity_condition() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, false)).await.unwrap();

    let committed = store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(committed.registered_count, 1);

    let err = store
        .tx_register_confirmed(registration("u2", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    // The failed transaction left no trace.
    let after = store.get_event("e").await.unwrap();
    assert_eq!(after.registered_count, 1);
    assert!(store.get_registration("u2", "e").await.is_err());
}

#[tokio::test]
async fn register_confirmed_rejects_existing_pair() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 2, false)).await.unwrap();
    store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();

    let err = store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
    // Count unchanged by the refused insert.
    assert_eq!(store.get_event("e").await.unwrap().registered_count, 1);
}

#[tokio::test]
async fn waitlist_append_requires_full_event_and_enabled_flag() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, true)).await.unwrap();

    // Not full yet: append refused.
    let err = store
        .tx_register_waitlist(registration("u1", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    let committed = store
        .tx_register_waitlist(registration("u2", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap();
    assert_eq!(committed.waitlist, vec!["u2".to_string()]);

    // Disabled waitlist refuses appends even when full.
    let disabled = store.put_event(event("d", 0, false)).await.unwrap();
    let err = store
        .tx_register_waitlist(registration("u3", &disabled, RegistrationStatus::Waitlist))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));
}

#[tokio::test]
async fn waitlist_append_rejects_queued_user() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, true)).await.unwrap();
    store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    store
        .tx_register_waitlist(registration("u2", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap();

    let err = store
        .tx_register_waitlist(registration("u2", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn unregister_guards_match_status() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, true)).await.unwrap();
    store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    store
        .tx_register_waitlist(registration("u2", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap();

    // Wrong-status transitions are refused.
    let err = store.tx_unregister_confirmed("u2", "e").await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));
    let err = store.tx_unregister_waitlist("u1", "e").await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    // Missing records are a condition failure, not a store NotFound: the
    // engine re-reads and reports the proper 404.
    let err = store.tx_unregister_confirmed("ghost", "e").await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));
}

#[tokio::test]
async fn unregister_waitlist_preserves_remaining_order() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, true)).await.unwrap();
    store
        .tx_register_confirmed(registration("u0", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    for u in ["u1", "u2", "u3", "u4"] {
        store
            .tx_register_waitlist(registration(u, &ev, RegistrationStatus::Waitlist))
            .await
            .unwrap();
    }

    let committed = store.tx_unregister_waitlist("u2", "e").await.unwrap();
    assert_eq!(
        committed.waitlist,
        vec!["u1".to_string(), "u3".to_string(), "u4".to_string()]
    );
}

#[tokio::test]
async fn promote_head_is_guarded_by_head_identity_and_capacity() {
    let store = MemoryStore::new();
    let ev = store.put_event(event("e", 1, true)).await.unwrap();
    store
        .tx_register_confirmed(registration("u1", &ev, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    store
        .tx_register_waitlist(registration("u2", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap();
    store
        .tx_register_waitlist(registration("u3", &ev, RegistrationStatus::Waitlist))
        .await
        .unwrap();

    // Wrong head refused.
    let err = store.tx_promote_head("e", "u3").await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    // No free slot refused.
    let err = store.tx_promote_head("e", "u2").await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    // Free the slot, then promotion commits atomically.
    store.tx_unregister_confirmed("u1", "e").await.unwrap();
    let committed = store.tx_promote_head("e", "u2").await.unwrap();
    assert_eq!(committed.registered_count, 1);
    assert_eq!(committed.waitlist, vec!["u3".to_string()]);
    let promoted = store.get_registration("u2", "e").await.unwrap();
    assert_eq!(promoted.status, RegistrationStatus::Confirmed);
}

#[tokio::test]
async fn query_registrations_filters_by_key() {
    let store = MemoryStore::new();
    let e1 = store.put_event(event("e1", 5, false)).await.unwrap();
    let e2 = store.put_event(event("e2", 5, false)).await.unwrap();
    store
        .tx_register_confirmed(registration("u1", &e1, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    store
        .tx_register_confirmed(registration("u1", &e2, RegistrationStatus::Confirmed))
        .await
        .unwrap();
    store
        .tx_register_confirmed(registration("u2", &e1, RegistrationStatus::Confirmed))
        .await
        .unwrap();

    assert_eq!(store.query_registrations_by_user("u1").await.unwrap().len(), 2);
    assert_eq!(store.query_registrations_by_event("e1").await.unwrap().len(), 2);
    assert!(store.query_registrations_by_user("ghost").await.unwrap().is_empty());
}
