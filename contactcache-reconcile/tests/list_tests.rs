use contactcache_reconcile::{diff, reconcile, reconcile_complete, Edit, EditLog};
use pretty_assertions::assert_eq;

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn run_complete(cache: &str, reference: &str) -> (Vec<char>, Vec<Edit<char>>) {
    let mut log = EditLog::new(chars(cache));
    let reference = chars(reference);
    let (mut c, mut r) = (0, 0);
    reconcile_complete(&mut log, &mut c, &reference, &mut r);
    assert_eq!(c, reference.len());
    assert_eq!(r, reference.len());
    log.into_parts()
}

// ── Concrete scenarios ───────────────────────────────────────────

#[test]
fn remove_then_append() {
    let (list, edits) = run_complete("ABCD", "ACDE");
    assert_eq!(list, chars("ACDE"));
    assert_eq!(
        edits,
        vec![
            Edit::Remove { index: 1, count: 1 },
            Edit::Insert { index: 3, items: vec!['E'] },
        ]
    );
}

#[test]
fn identical_lists_emit_nothing() {
    let (list, edits) = run_complete("ABCDEFG", "ABCDEFG");
    assert_eq!(list, chars("ABCDEFG"));
    assert!(edits.is_empty());
}

#[test]
fn empty_cache_inserts_everything_once() {
    let (list, edits) = run_complete("", "ABC");
    assert_eq!(list, chars("ABC"));
    assert_eq!(edits, vec![Edit::Insert { index: 0, items: chars("ABC") }]);
}

#[test]
fn empty_reference_removes_everything_once() {
    let (list, edits) = run_complete("ABC", "");
    assert!(list.is_empty());
    assert_eq!(edits, vec![Edit::Remove { index: 0, count: 3 }]);
}

#[test]
fn single_move_is_one_remove_and_one_insert() {
    let (list, edits) = run_complete("ABCDE", "ACDBE");
    assert_eq!(list, chars("ACDBE"));
    assert_eq!(
        edits,
        vec![
            Edit::Remove { index: 1, count: 1 },
            Edit::Insert { index: 3, items: vec!['B'] },
        ]
    );
}

#[test]
fn move_to_front_is_one_remove_and_one_insert() {
    let (list, edits) = run_complete("ABCDEF", "EABCDF");
    assert_eq!(list, chars("EABCDF"));
    let removes = edits.iter().filter(|e| matches!(e, Edit::Remove { .. })).count();
    let inserts = edits.iter().filter(|e| matches!(e, Edit::Insert { .. })).count();
    assert_eq!((removes, inserts), (1, 1));
}

#[test]
fn insert_in_middle_touches_only_the_new_element() {
    let (list, edits) = run_complete("ABDE", "ABCDE");
    assert_eq!(list, chars("ABCDE"));
    assert_eq!(edits, vec![Edit::Insert { index: 2, items: vec!['C'] }]);
}

#[test]
fn replacement_run_is_one_remove_and_one_insert() {
    let (list, edits) = run_complete("ABXYZF", "ABPQF");
    assert_eq!(list, chars("ABPQF"));
    assert_eq!(
        edits,
        vec![
            Edit::Remove { index: 2, count: 3 },
            Edit::Insert { index: 2, items: chars("PQ") },
        ]
    );
}

#[test]
fn disjoint_lists_fall_back_to_tail_replacement() {
    let (list, edits) = run_complete("ABC", "XYZ");
    assert_eq!(list, chars("XYZ"));
    assert_eq!(
        edits,
        vec![
            Edit::Remove { index: 0, count: 3 },
            Edit::Insert { index: 0, items: chars("XYZ") },
        ]
    );
}

#[test]
fn diff_helper_matches_agent() {
    let edits = diff(&[1, 2, 3], &[1, 3]);
    assert_eq!(edits, vec![Edit::Remove { index: 1, count: 1 }]);
}

// ── Partial reconciliation ───────────────────────────────────────

#[test]
fn partial_reconcile_stops_without_truncating() {
    let mut log = EditLog::new(chars("ABCD"));
    let (mut c, mut r) = (0, 0);
    reconcile(&mut log, &mut c, &chars("AB"), &mut r);

    // The reference is only a prefix; the cache tail must survive.
    assert_eq!(log.list(), chars("ABCD").as_slice());
    assert!(log.edits().is_empty());
    assert_eq!((c, r), (2, 2));
}

#[test]
fn disjoint_partial_reconcile_leaves_cursors_at_divergence() {
    let mut log = EditLog::new(chars("AXY"));
    let (mut c, mut r) = (0, 0);
    reconcile(&mut log, &mut c, &chars("APQ"), &mut r);
    assert_eq!((c, r), (1, 1));
    assert!(log.edits().is_empty());
}

#[test]
fn progressive_delivery_resumes_from_cursors() {
    let reference = chars("ACDEFG");
    let mut log = EditLog::new(chars("ABCDFG"));
    let (mut c, mut r) = (0, 0);

    reconcile(&mut log, &mut c, &reference[..3], &mut r);
    let after_first_page = log.edits().len();
    reconcile_complete(&mut log, &mut c, &reference, &mut r);

    assert_eq!(log.list(), reference.as_slice());
    assert!(after_first_page >= 1);
    assert_eq!(c, reference.len());
}

#[test]
fn growing_reference_with_same_storage() {
    let full = chars("ABCDEFGHIJ");
    let mut reference = Vec::new();
    let mut log = EditLog::new(chars("ABDEFHIJ"));
    let (mut c, mut r) = (0, 0);

    for page in full.chunks(3) {
        reference.extend_from_slice(page);
        reconcile(&mut log, &mut c, &reference, &mut r);
    }
    reconcile_complete(&mut log, &mut c, &reference, &mut r);

    assert_eq!(log.list(), full.as_slice());
    assert_eq!(
        log.edits().to_vec(),
        vec![
            Edit::Insert { index: 2, items: vec!['C'] },
            Edit::Insert { index: 6, items: vec!['G'] },
        ]
    );
}

// ── Edit ordering ────────────────────────────────────────────────

#[test]
fn edits_are_emitted_in_ascending_index_order() {
    let (_, edits) = run_complete("ABCDEFGHIJ", "ACDXEFHIZJ");
    let indices: Vec<usize> = edits
        .iter()
        .map(|e| match e {
            Edit::Insert { index, .. } | Edit::Remove { index, .. } => *index,
        })
        .collect();
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    assert_eq!(indices, sorted);
}
