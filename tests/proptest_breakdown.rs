//! Property tests: store breakdowns against a direct set computation.

mod common;

use bug_trends::model::{Breakdown, IssueRow};
use bug_trends::storage::{IssueFilter, SnapshotReader};
use common::fixtures::{IssueBuilder, day, record};
use proptest::prelude::*;
use std::collections::BTreeMap;

const COMPONENTS: [&str; 3] = ["Kernel", "Networking", "Storage"];

fn snapshot_strategy() -> impl Strategy<Value = BTreeMap<i64, usize>> {
    // id -> component index; at least one issue so the day is recorded.
    prop::collection::btree_map(0_i64..30, 0_usize..COMPONENTS.len(), 1..15)
}

fn rows(snapshot: &BTreeMap<i64, usize>) -> Vec<IssueRow> {
    snapshot
        .iter()
        .map(|(id, component)| IssueBuilder::new(*id).component(COMPONENTS[*component]).build())
        .collect()
}

fn expected(
    before: &BTreeMap<i64, usize>,
    after: &BTreeMap<i64, usize>,
    component: Option<usize>,
) -> Breakdown {
    let matches = |c: &usize| component.is_none_or(|want| *c == want);
    Breakdown {
        total: after.values().filter(|c| matches(c)).count(),
        new: after
            .iter()
            .filter(|(id, c)| matches(c) && !before.contains_key(id))
            .count(),
        closed: before
            .iter()
            .filter(|(id, c)| matches(c) && !after.contains_key(id))
            .count(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        ..Default::default()
    })]

    /// Property: breakdown matches set difference with the unfiltered
    /// absence check.
    #[test]
    fn prop_breakdown_matches_model(
        before in snapshot_strategy(),
        after in snapshot_strategy(),
        component in prop::option::of(0_usize..COMPONENTS.len()),
    ) {
        common::init_test_logging();
        let store = common::test_store();
        record(&store, "2024-01-01", &rows(&before));
        record(&store, "2024-01-02", &rows(&after));

        let filter = IssueFilter::for_components(component.map(|c| vec![COMPONENTS[c].to_string()]));
        let view = store.begin_read().unwrap();
        let actual = view
            .breakdown(Some(day("2024-01-01")), day("2024-01-02"), &filter)
            .unwrap();
        prop_assert_eq!(actual, expected(&before, &after, component));

        let batch = view.breakdowns_for_all_dates(&filter).unwrap();
        prop_assert_eq!(batch.get(&day("2024-01-02")).copied(), Some(actual));
    }

    /// Property: a day compared with itself never has churn.
    #[test]
    fn prop_same_snapshot_no_churn(snapshot in snapshot_strategy()) {
        let store = common::test_store();
        record(&store, "2024-01-01", &rows(&snapshot));
        record(&store, "2024-01-02", &rows(&snapshot));

        let view = store.begin_read().unwrap();
        let b = view
            .breakdown(Some(day("2024-01-01")), day("2024-01-02"), &IssueFilter::new())
            .unwrap();
        prop_assert_eq!(b.new, 0);
        prop_assert_eq!(b.closed, 0);
        prop_assert_eq!(b.total, snapshot.len());
    }
}
