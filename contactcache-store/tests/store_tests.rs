use contactcache_store::{EntryState, RecordStore, StoreError};
use contactcache_types::{Contact, KeyKind, Presence, RecordHandle, ViewId};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::time::Instant;

const GRACE: Duration = Duration::from_secs(30);

fn h(n: u32) -> RecordHandle {
    RecordHandle::new(n).unwrap()
}

fn alice() -> Contact {
    Contact::new("contacts::1")
        .with_name("Alice", "Archer")
        .with_phone("+1 (555) 010-2000")
        .with_email("Alice@Example.com")
}

#[derive(Debug, PartialEq)]
struct Tokens(Vec<String>);

// ── Fetch queue ──────────────────────────────────────────────────

#[test]
fn request_queues_absent_records_once() {
    let mut store = RecordStore::new(GRACE);
    assert!(store.request(h(3)));
    assert!(store.request(h(1)));
    assert!(!store.request(h(3)));
    assert_eq!(store.entry(h(3)).unwrap().state(), EntryState::Requested);

    assert_eq!(store.take_requested(), vec![h(1), h(3)]);
    assert!(store.take_requested().is_empty());
}

#[test]
fn fetched_records_are_not_requested_again() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();
    assert!(!store.request(h(1)));
}

#[test]
fn cancel_request_returns_entry_to_absent() {
    let mut store = RecordStore::new(GRACE);
    store.request(h(5));
    store.cancel_request(h(5));
    assert_eq!(store.entry(h(5)).unwrap().state(), EntryState::Absent);
    assert!(store.take_requested().is_empty());
    assert!(store.request(h(5)));
}

#[test]
fn drained_requests_can_be_queued_again() {
    let mut store = RecordStore::new(GRACE);
    store.request(h(1));
    store.request(h(2));
    assert_eq!(store.take_requested(), vec![h(1), h(2)]);

    // 1 arrived before the fetch broke off.
    store.apply_result(alice()).unwrap();
    assert!(!store.requeue(h(1)));
    assert!(store.requeue(h(2)));
    assert!(!store.requeue(h(9)));
    assert_eq!(store.take_requested(), vec![h(2)]);
}

// ── Fetch results ────────────────────────────────────────────────

#[test]
fn apply_result_fills_requested_entry() {
    let mut store = RecordStore::new(GRACE);
    store.request(h(1));

    assert!(store.apply_result(alice()).unwrap());
    assert_eq!(store.entry(h(1)).unwrap().state(), EntryState::Fetched);
    assert_eq!(store.lookup(h(1)).unwrap().first_name, "Alice");
    assert!(store.take_requested().is_empty());
}

#[test]
fn apply_result_rejects_malformed_identifier() {
    let mut store = RecordStore::new(GRACE);
    let err = store.apply_result(Contact::new("no-number-here")).unwrap_err();
    assert_eq!(err, StoreError::InvalidIdentifier("no-number-here".into()));
    assert!(store.is_empty());
}

#[test]
fn role_change_is_reported_only_for_rendered_fields() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();

    let presence_only = alice().with_presence(Presence::Available);
    assert!(!store.apply_result(presence_only).unwrap());

    let renamed = alice().with_name("Alicia", "Archer");
    assert!(store.apply_result(renamed).unwrap());
}

#[test]
fn any_change_clears_listener_data() {
    let mut store = RecordStore::new(GRACE);
    let view = ViewId::new(1);
    store.apply_result(alice()).unwrap();

    store.set_listener_data(h(1), view, Tokens(vec!["alice".into()])).unwrap();
    store.apply_result(alice()).unwrap();
    assert_eq!(
        store.listener_data::<Tokens>(h(1), view),
        Some(&Tokens(vec!["alice".into()]))
    );

    store.apply_result(alice().with_favorite(true)).unwrap();
    assert_eq!(store.listener_data::<Tokens>(h(1), view), None);
}

#[test]
fn listener_data_of_wrong_type_is_not_returned() {
    let mut store = RecordStore::new(GRACE);
    let view = ViewId::new(2);
    store.get_or_create(h(1));
    store.set_listener_data(h(1), view, 42u32).unwrap();
    assert_eq!(store.listener_data::<String>(h(1), view), None);
    assert_eq!(store.listener_data::<u32>(h(1), view), Some(&42));

    store.clear_listener_data(view);
    assert_eq!(store.listener_data::<u32>(h(1), view), None);
}

#[test]
fn complete_survives_identical_refetch() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();
    store.mark_complete(h(1)).unwrap();
    store.apply_result(alice()).unwrap();
    assert_eq!(store.entry(h(1)).unwrap().state(), EntryState::Complete);

    store.apply_result(alice().with_favorite(true)).unwrap();
    assert_eq!(store.entry(h(1)).unwrap().state(), EntryState::Fetched);
}

#[test]
fn mark_complete_unknown_record() {
    let mut store = RecordStore::new(GRACE);
    assert_eq!(store.mark_complete(h(9)), Err(StoreError::NotFound(h(9))));
}

// ── Secondary lookup ─────────────────────────────────────────────

#[test]
fn phone_lookup_matches_local_and_international_forms() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();

    for raw in ["+1 (555) 010-2000", "555-010-2000", "5550102000"] {
        let found = store.lookup_by_secondary_key(KeyKind::Phone, raw);
        assert_eq!(found.map(|c| c.handle()), Some(Some(h(1))), "{raw}");
    }
    assert!(store.lookup_by_secondary_key(KeyKind::Phone, "555-010-2001").is_none());
}

#[test]
fn email_lookup_ignores_case_and_whitespace() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();
    let found = store.lookup_by_secondary_key(KeyKind::Email, "  alice@EXAMPLE.com ");
    assert_eq!(found.unwrap().last_name, "Archer");
}

#[test]
fn changed_keys_are_reindexed() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();

    let mut moved = alice();
    moved.emails = vec!["alice@elsewhere.org".into()];
    store.apply_result(moved).unwrap();

    assert!(store.lookup_by_secondary_key(KeyKind::Email, "alice@example.com").is_none());
    assert!(store.lookup_by_secondary_key(KeyKind::Email, "alice@elsewhere.org").is_some());
}

#[test]
fn shared_key_resolves_to_lowest_handle() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(Contact::new("contacts::7").with_phone("555 0100")).unwrap();
    store.apply_result(Contact::new("contacts::4").with_phone("5550100")).unwrap();
    let found = store.lookup_by_secondary_key(KeyKind::Phone, "555-0100").unwrap();
    assert_eq!(found.handle(), Some(h(4)));
}

#[test]
fn removed_record_leaves_the_index() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();

    let dropped = store.mark_removed(h(1)).unwrap();
    assert_eq!(dropped.first_name, "Alice");
    assert_eq!(store.entry(h(1)).unwrap().state(), EntryState::Removed);
    assert!(store.lookup(h(1)).is_none());
    assert!(store.lookup_by_secondary_key(KeyKind::Phone, "555-010-2000").is_none());
}

// ── Lifetime ─────────────────────────────────────────────────────

#[test]
fn evict_refuses_pinned_entries() {
    let mut store = RecordStore::new(GRACE);
    store.apply_result(alice()).unwrap();

    let guard = store.acquire(h(1));
    assert_eq!(store.evict(h(1)), Err(StoreError::Pinned(h(1))));
    drop(guard);

    store.add_view_ref(h(1));
    assert_eq!(store.evict(h(1)), Err(StoreError::Pinned(h(1))));
    store.release_view_ref(h(1));

    store.set_listener_data(h(1), ViewId::new(1), ()).unwrap();
    assert_eq!(store.evict(h(1)), Err(StoreError::Pinned(h(1))));
    store.clear_listener_data(ViewId::new(1));

    store.request(h(2));
    assert_eq!(store.evict(h(2)), Err(StoreError::Pinned(h(2))));

    assert_eq!(store.evict(h(1)), Ok(()));
    assert!(!store.contains(h(1)));
    assert!(store.lookup_by_secondary_key(KeyKind::Phone, "555-010-2000").is_none());
    assert_eq!(store.evict(h(1)), Err(StoreError::NotFound(h(1))));
}

#[test]
fn unreferenced_entries_expire_after_grace() {
    let mut store = RecordStore::new(GRACE);
    let t0 = Instant::now();
    store.apply_result(alice()).unwrap();

    assert!(store.expire(t0).is_empty());
    assert!(store.expire(t0 + GRACE - Duration::from_millis(1)).is_empty());
    assert_eq!(store.expire(t0 + GRACE), vec![h(1)]);
    assert!(store.is_empty());
}

#[test]
fn dropped_guard_starts_the_grace_period() {
    let mut store = RecordStore::new(GRACE);
    let t0 = Instant::now();
    store.apply_result(alice()).unwrap();

    let guard = store.acquire(h(1));
    assert_eq!(store.entry(h(1)).unwrap().guard_count(), 1);
    assert!(store.expire(t0 + GRACE * 2).is_empty());

    drop(guard);
    let t1 = t0 + GRACE * 3;
    assert!(store.expire(t1).is_empty());
    assert_eq!(store.expire(t1 + GRACE), vec![h(1)]);
}

#[test]
fn reacquire_cancels_pending_expiry() {
    let mut store = RecordStore::new(GRACE);
    let t0 = Instant::now();
    store.apply_result(alice()).unwrap();
    drop(store.acquire(h(1)));
    assert!(store.expire(t0).is_empty());

    let _guard = store.acquire(h(1));
    assert!(store.expire(t0 + GRACE * 10).is_empty());
    assert!(store.contains(h(1)));
}

#[test]
fn last_view_release_drops_listener_data_and_expires() {
    let mut store = RecordStore::new(GRACE);
    let t0 = Instant::now();
    let view = ViewId::new(3);
    store.apply_result(alice()).unwrap();
    store.add_view_ref(h(1));
    store.add_view_ref(h(1));
    store.set_listener_data(h(1), view, "tokens").unwrap();

    store.release_view_ref(h(1));
    assert!(store.listener_data::<&str>(h(1), view).is_some());
    assert!(store.expire(t0 + GRACE * 5).is_empty());

    store.release_view_ref(h(1));
    assert!(store.listener_data::<&str>(h(1), view).is_none());
    assert!(store.expire(t0).is_empty());
    assert_eq!(store.expire(t0 + GRACE), vec![h(1)]);
}

#[test]
fn requested_entries_wait_for_their_fetch() {
    let mut store = RecordStore::new(GRACE);
    let t0 = Instant::now();
    store.request(h(8));
    assert!(store.expire(t0).is_empty());
    assert!(store.expire(t0 + GRACE * 4).is_empty());

    store.cancel_request(h(8));
    assert_eq!(store.expire(t0 + GRACE * 4), vec![h(8)]);
}
