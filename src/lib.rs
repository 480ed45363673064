//! `bug_trends` - daily issue-tracker snapshots and trend rollups.
//!
//! Each day the full issue set of a tracker search is recorded as one
//! snapshot. Comparing consecutive snapshots yields, per day and filter, how
//! many issues exist, how many are new and how many closed. Rollups bundle
//! those figures for all issues, blockers and customer cases, and release
//! windows scope them to a product release.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod service;
pub mod storage;
pub mod util;

pub use error::{ErrorCode, PublicError, Result, StructuredError, TrendsError};
pub use service::TrendService;
