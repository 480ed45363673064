mod common;

use bug_trends::config::TrendsConfig;
use bug_trends::error::{ErrorCode, ErrorKind};
use bug_trends::model::{Milestones, Release};
use bug_trends::{TrendService, TrendsError};
use common::fixtures::{IssueBuilder, issue, record};
use common::{test_log, test_store};

fn config() -> TrendsConfig {
    TrendsConfig {
        releases: vec![
            Release {
                name: "4.10".to_string(),
                targets: vec!["4.10.0".to_string()],
                milestones: Milestones::default(),
            },
            Release {
                name: "4.12".to_string(),
                targets: vec!["4.12.0".to_string()],
                milestones: Milestones {
                    start: "2030-01-01".to_string(),
                    ..Milestones::default()
                },
            },
        ],
        blockers: vec!["TestBlocker".to_string()],
        ..TrendsConfig::default()
    }
}

#[test]
fn not_found_messages_are_specific() {
    let _log = test_log("not_found_messages_are_specific");
    let store = test_store();
    let config = config();
    let service = TrendService::new(&store, &config);

    let err = service.issues("", None).unwrap_err();
    assert_eq!(err.code, ErrorCode::NoSnapshots);
    assert_eq!(err.message, "No snapshots recorded");

    let err = service.release("5.0", None).unwrap_err();
    assert_eq!(err.code, ErrorCode::ReleaseNotFound);
    assert!(err.message.contains("5.0"));
}

#[test]
fn invalid_range_names_release_only() {
    let _log = test_log("invalid_range_names_release_only");
    let store = test_store();
    record(&store, "2024-01-01", &[issue(1)]);
    let config = config();

    let err = TrendService::new(&store, &config)
        .release("4.12", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert_eq!(err.message, "Invalid dates for release '4.12'");
}

#[test]
fn bad_date_is_config_error() {
    let _log = test_log("bad_date_is_config_error");
    let store = test_store();
    record(&store, "2024-01-01", &[issue(1)]);
    let config = config();

    let err = TrendService::new(&store, &config)
        .snapshot("01/02/2024", None)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidDate);
    assert!(!err.message.contains("SELECT"));
}

#[test]
fn public_error_converts_for_cli() {
    let _log = test_log("public_error_converts_for_cli");
    let store = test_store();
    let config = config();
    let public = TrendService::new(&store, &config)
        .rollups(None)
        .unwrap_err();
    let err: TrendsError = public.into();
    assert_eq!(ErrorCode::from_error(&err).exit_code(), 3);
    assert_eq!(err.to_string(), "No snapshots recorded");
}

#[test]
fn component_filter_applies_to_release_rollups() {
    let _log = test_log("component_filter_applies_to_release_rollups");
    let store = test_store();
    record(
        &store,
        "2024-01-01",
        &[
            IssueBuilder::new(1).target("4.10.0").build(),
            IssueBuilder::new(2)
                .target("4.10.0")
                .component("Networking")
                .keyword("TestBlocker")
                .build(),
        ],
    );
    let config = config();
    let service = TrendService::new(&store, &config);

    let all = service.release("4.10", None).unwrap();
    assert_eq!(all.rollups[0].all.total, 2);
    assert_eq!(all.rollups[0].blockers.total, 1);

    let networking = service
        .release("4.10", Some(vec!["Networking".to_string()]))
        .unwrap();
    assert_eq!(networking.rollups[0].all.total, 1);
    assert_eq!(networking.rollups[0].blockers.total, 1);

    let kernel = service
        .release("4.10", Some(vec!["Kernel".to_string()]))
        .unwrap();
    assert_eq!(kernel.rollups[0].blockers.total, 0);
}
