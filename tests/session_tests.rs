use portal_client::SessionStore;
use std::sync::{Arc, Mutex};

// --- Token State ---

#[test]
fn test_is_authenticated_tracks_latest_call() {
    let store = SessionStore::in_memory();
    assert!(!store.is_authenticated());

    // For any sequence of set/clear calls, the state reflects exactly the
    // most recent call's effect.
    store.set_token("tok-1");
    assert!(store.is_authenticated());
    store.set_token("tok-2");
    assert!(store.is_authenticated());
    assert_eq!(store.token().as_deref(), Some("tok-2"));
    store.clear_token();
    assert!(!store.is_authenticated());
    assert_eq!(store.token(), None);
    store.set_token("tok-3");
    assert!(store.is_authenticated());
    store.clear_token();
    store.clear_token(); // idempotent
    assert!(!store.is_authenticated());
}

#[test]
fn test_empty_token_is_not_authenticated() {
    let store = SessionStore::in_memory();
    store.set_token("");
    assert!(!store.is_authenticated());
}

// --- Subscriptions ---

#[test]
fn test_listeners_observe_every_mutation() {
    let store = SessionStore::in_memory();
    let events: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = events.clone();
    store.subscribe(move |authenticated| sink.lock().unwrap().push(authenticated));

    store.set_token("tok");
    store.clear_token();
    store.set_token("tok-2");

    assert_eq!(*events.lock().unwrap(), vec![true, false, true]);
}

#[test]
fn test_listener_can_read_store_reentrantly() {
    let store = Arc::new(SessionStore::in_memory());
    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let inner = store.clone();
    let sink = seen.clone();
    store.subscribe(move |_| sink.lock().unwrap().push(inner.is_authenticated()));

    store.set_token("tok");
    store.clear_token();

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

// --- Durable Persistence ---

#[test]
fn test_token_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.token");

    let store = SessionStore::with_storage(path.clone());
    store.set_token("persisted-token");

    // A fresh store over the same path resumes the session.
    let restarted = SessionStore::with_storage(path);
    assert!(restarted.is_authenticated());
    assert_eq!(restarted.token().as_deref(), Some("persisted-token"));
}

#[test]
fn test_clear_removes_persisted_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.token");

    let store = SessionStore::with_storage(path.clone());
    store.set_token("short-lived");
    store.clear_token();

    assert!(!path.exists());
    let restarted = SessionStore::with_storage(path);
    assert!(!restarted.is_authenticated());
}
