mod common;

use bug_trends::analytics::RollupAssembler;
use bug_trends::model::{Category, ReleaseWindow};
use bug_trends::storage::{IssueFilter, SnapshotReader};
use common::fixtures::{IssueBuilder, day, issue, record};
use common::{test_log, test_store, test_store_with_dir};
use std::sync::Barrier;
use std::thread;

fn window(start: &str, end: &str) -> ReleaseWindow {
    ReleaseWindow {
        start: day(start),
        end: day(end),
    }
}

#[test]
fn series_skips_days_without_snapshot() {
    let _log = test_log("series_skips_days_without_snapshot");
    let store = test_store();
    record(&store, "2024-03-01", &[issue(1)]);
    record(&store, "2024-03-02", &[issue(1), issue(2)]);
    record(&store, "2024-03-05", &[issue(2)]);

    let view = store.begin_read().unwrap();
    let blockers: Vec<String> = Vec::new();
    let rollups = RollupAssembler::new(&blockers)
        .assemble(&view, window("2024-03-01", "2024-03-07"), &IssueFilter::new())
        .unwrap();

    let dates: Vec<_> = rollups.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        [day("2024-03-01"), day("2024-03-02"), day("2024-03-05")]
    );
    assert_eq!(rollups[2].all.total, 1);
    assert_eq!(rollups[2].all.closed, 1);
}

#[test]
fn first_day_in_window_compares_with_earlier_snapshot() {
    let _log = test_log("first_day_in_window_compares_with_earlier_snapshot");
    let store = test_store();
    record(&store, "2024-02-20", &[issue(1), issue(2)]);
    record(&store, "2024-03-01", &[issue(2), issue(3)]);

    let view = store.begin_read().unwrap();
    let blockers: Vec<String> = Vec::new();
    let rollups = RollupAssembler::new(&blockers)
        .assemble(&view, window("2024-03-01", "2024-03-31"), &IssueFilter::new())
        .unwrap();

    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0].all.new, 1);
    assert_eq!(rollups[0].all.closed, 1);
}

#[test]
fn categories_use_their_own_filters() {
    let _log = test_log("categories_use_their_own_filters");
    let store = test_store();
    record(
        &store,
        "2024-03-01",
        &[
            IssueBuilder::new(1).keyword("UpgradeBlocker").build(),
            IssueBuilder::new(2).customer_case().build(),
            IssueBuilder::new(3).external(12).build(),
            issue(4),
        ],
    );

    let view = store.begin_read().unwrap();
    let blockers = vec!["TestBlocker".to_string(), "UpgradeBlocker".to_string()];
    let rollups = RollupAssembler::new(&blockers)
        .assemble(&view, window("2024-03-01", "2024-03-01"), &IssueFilter::new())
        .unwrap();

    let rollup = rollups[0];
    assert_eq!(rollup.get(Category::All).total, 4);
    assert_eq!(rollup.get(Category::Blockers).total, 1);
    assert_eq!(rollup.get(Category::CustomerCases).total, 1);
}

#[test]
fn worker_count_does_not_change_result() {
    let _log = test_log("worker_count_does_not_change_result");
    let store = test_store();
    let start = day("2024-01-01");
    for offset in 0..20_u64 {
        let date = start + chrono::Days::new(offset * 2);
        let rows: Vec<_> = (0..=i64::try_from(offset).unwrap() % 7)
            .map(|id| issue(id + i64::try_from(offset / 3).unwrap()))
            .collect();
        record(&store, &date.format("%Y-%m-%d").to_string(), &rows);
    }

    let view = store.begin_read().unwrap();
    let blockers: Vec<String> = Vec::new();
    let span = window("2024-01-01", "2024-03-01");
    let serial = RollupAssembler::new(&blockers)
        .with_parallelism(1)
        .assemble(&view, span, &IssueFilter::new())
        .unwrap();
    let parallel = RollupAssembler::new(&blockers)
        .with_parallelism(8)
        .assemble(&view, span, &IssueFilter::new())
        .unwrap();

    assert_eq!(serial.len(), 20);
    assert_eq!(serial, parallel);
    assert_eq!(
        serial,
        RollupAssembler::new(&blockers)
            .assemble_all(&view, &IssueFilter::new())
            .unwrap()
    );
}

#[test]
fn pinned_view_ignores_concurrent_replacement() {
    let _log = test_log("pinned_view_ignores_concurrent_replacement");
    let (store, _dir) = test_store_with_dir();
    record(&store, "2024-03-01", &[issue(1), issue(2)]);
    record(&store, "2024-03-02", &[issue(1), issue(2), issue(3)]);

    let view = store.begin_read().unwrap();
    let blockers: Vec<String> = Vec::new();
    let span = window("2024-03-01", "2024-03-02");
    let before = RollupAssembler::new(&blockers)
        .assemble(&view, span, &IssueFilter::new())
        .unwrap();

    let barrier = Barrier::new(2);
    thread::scope(|s| {
        s.spawn(|| {
            barrier.wait();
            record(&store, "2024-03-02", &[issue(9)]);
            record(&store, "2024-03-03", &[issue(9), issue(10)]);
        });
        barrier.wait();
        for _ in 0..5 {
            let again = RollupAssembler::new(&blockers)
                .assemble(&view, span, &IssueFilter::new())
                .unwrap();
            assert_eq!(again, before);
        }
    });

    assert_eq!(view.latest_date().unwrap(), day("2024-03-02"));
    let fresh = store.begin_read().unwrap();
    assert_eq!(fresh.latest_date().unwrap(), day("2024-03-03"));
    assert_eq!(
        fresh
            .breakdown(Some(day("2024-03-01")), day("2024-03-02"), &IssueFilter::new())
            .unwrap()
            .total,
        1
    );
}
