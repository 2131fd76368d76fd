use contactcache_store::RecordStore;
use contactcache_types::{Contact, ListKind, RecordHandle};
use std::collections::HashSet;
use contactcache_view::{EventLog, ViewEvent, ViewFilter, ViewRegistry};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::time::Duration;

fn handles() -> impl Strategy<Value = Vec<u32>> {
    subsequence((1..=30).collect::<Vec<u32>>(), 0..=30).prop_shuffle()
}

fn store() -> RecordStore {
    let mut store = RecordStore::new(Duration::from_secs(30));
    for n in 1..=30u32 {
        let contact = Contact::new(format!("contacts::{n}")).with_favorite(n % 3 == 0);
        store.apply_result(contact).unwrap();
    }
    store
}

fn to_handles(ns: &[u32]) -> Vec<RecordHandle> {
    ns.iter().filter_map(|n| RecordHandle::new(*n)).collect()
}

/// Replays a view's events against its starting length, checking that
/// every change is announced in matching pairs over valid ranges.
fn replay(start_len: usize, events: &[ViewEvent]) -> Result<usize, TestCaseError> {
    let mut len = start_len;
    let mut iter = events.iter();
    while let Some(event) = iter.next() {
        match *event {
            ViewEvent::AboutToInsert { view, begin, end } => {
                prop_assert!(begin < end && begin <= len);
                prop_assert_eq!(iter.next(), Some(&ViewEvent::Inserted { view, begin, end }));
                len += end - begin;
            }
            ViewEvent::AboutToRemove { view, begin, end } => {
                prop_assert!(begin < end && end <= len);
                prop_assert_eq!(iter.next(), Some(&ViewEvent::Removed { view, begin, end }));
                len -= end - begin;
            }
            ViewEvent::Populated { .. } | ViewEvent::DataChanged { .. } => {}
            ViewEvent::Inserted { .. } | ViewEvent::Removed { .. } => {
                prop_assert!(false, "change without announcement: {:?}", event);
            }
        }
    }
    Ok(len)
}

proptest! {
    #[test]
    fn notifications_balance_and_views_match_their_filter(
        before in handles(),
        after in handles(),
        page in 1usize..6,
    ) {
        let mut store = store();
        let mut registry = ViewRegistry::new();
        let all = registry.register_view(ListKind::All, None, &mut store);
        let favorites = registry.register_view(ListKind::All, Some(ViewFilter::Favorites), &mut store);

        registry.begin_sync(ListKind::All);
        registry.finish_sync(ListKind::All, &to_handles(&before), &mut store);

        let all_log = EventLog::new();
        let fav_log = EventLog::new();
        registry.subscribe(all, Box::new(all_log.clone())).unwrap();
        registry.subscribe(favorites, Box::new(fav_log.clone())).unwrap();
        let all_len = registry.rows(all).unwrap().len();
        let fav_len = registry.rows(favorites).unwrap().len();

        let reference = to_handles(&after);
        let mut delivered = Vec::new();
        registry.begin_sync(ListKind::All);
        for chunk in reference.chunks(page) {
            delivered.extend_from_slice(chunk);
            registry.sync_list(ListKind::All, &delivered, &mut store);
        }
        registry.finish_sync(ListKind::All, &reference, &mut store);

        let expected_favorites: Vec<RecordHandle> = reference
            .iter()
            .copied()
            .filter(|h| h.get() % 3 == 0)
            .collect();
        prop_assert_eq!(registry.rows(all).unwrap(), reference.as_slice());
        prop_assert_eq!(registry.rows(favorites).unwrap(), expected_favorites.as_slice());

        prop_assert_eq!(replay(all_len, &all_log.take())?, reference.len());
        prop_assert_eq!(replay(fav_len, &fav_log.take())?, expected_favorites.len());

        for handle in &reference {
            prop_assert_eq!(store.entry(*handle).unwrap().view_refs(), 1);
        }
    }
}

/// A filter the interleaving test can switch to, with its expected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Everything,
    Favorites,
    Odd,
}

impl Mode {
    fn filter(self) -> Option<ViewFilter> {
        match self {
            Self::Everything => None,
            Self::Favorites => Some(ViewFilter::Favorites),
            Self::Odd => Some(ViewFilter::custom(|c: &Contact| {
                c.handle().is_some_and(|h| h.get() % 2 == 1)
            })),
        }
    }

    fn admits(self, contact: &Contact) -> bool {
        match self {
            Self::Everything => true,
            Self::Favorites => contact.favorite,
            Self::Odd => contact.handle().is_some_and(|h| h.get() % 2 == 1),
        }
    }
}

proptest! {
    #[test]
    fn filter_and_record_changes_between_pages_keep_views_exact(
        before in handles(),
        after in handles(),
        page in 1usize..6,
        actions in prop::collection::vec((0u8..5, 1u32..=30), 0..8),
    ) {
        let mut store = store();
        let mut registry = ViewRegistry::new();
        let view = registry.register_view(ListKind::All, None, &mut store);
        registry.begin_sync(ListKind::All);
        registry.finish_sync(ListKind::All, &to_handles(&before), &mut store);

        let log = EventLog::new();
        registry.subscribe(view, Box::new(log.clone())).unwrap();
        let start_len = registry.rows(view).unwrap().len();
        let mut mode = Mode::Everything;
        let mut favorites: HashSet<u32> = (1..=30).filter(|n| n % 3 == 0).collect();

        let reference = to_handles(&after);
        let mut delivered = Vec::new();
        registry.begin_sync(ListKind::All);
        for (i, chunk) in reference.chunks(page).enumerate() {
            delivered.extend_from_slice(chunk);
            registry.sync_list(ListKind::All, &delivered, &mut store);

            if let Some(&(action, n)) = actions.get(i) {
                match action {
                    0 => {}
                    1 => mode = Mode::Favorites,
                    2 => mode = Mode::Everything,
                    3 => mode = Mode::Odd,
                    _ => {
                        let favorite = !favorites.remove(&n);
                        if favorite {
                            favorites.insert(n);
                        }
                        let contact = Contact::new(format!("contacts::{n}")).with_favorite(favorite);
                        store.apply_result(contact).unwrap();
                        registry.record_changed(RecordHandle::new(n).unwrap(), &mut store);
                    }
                }
                if (1..=3).contains(&action) {
                    registry.set_filter(view, mode.filter(), &mut store).unwrap();
                }
            }

            let expected: Vec<RecordHandle> = registry
                .list_rows(ListKind::All)
                .iter()
                .copied()
                .filter(|h| mode.admits(store.lookup(*h).unwrap()))
                .collect();
            prop_assert_eq!(registry.rows(view).unwrap(), expected.as_slice());
        }
        registry.finish_sync(ListKind::All, &reference, &mut store);

        let expected: Vec<RecordHandle> = reference
            .iter()
            .copied()
            .filter(|h| mode.admits(store.lookup(*h).unwrap()))
            .collect();
        prop_assert_eq!(registry.rows(view).unwrap(), expected.as_slice());
        prop_assert_eq!(replay(start_len, &log.take())?, expected.len());
    }
}
