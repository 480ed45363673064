//! One module per subcommand.

pub mod config;
pub mod dates;
pub mod history;
pub mod ingest;
pub mod issues;
pub mod prune;
pub mod release;
pub mod releases;
pub mod rollups;
pub mod snapshot;

use crate::config::TrendsConfig;
use crate::error::Result;
use crate::storage::SnapshotStore;
use tracing::debug;

/// Open the configured snapshot store.
pub(crate) fn open_store(config: &TrendsConfig) -> Result<SnapshotStore> {
    debug!(path = %config.database.display(), "Opening snapshot store");
    SnapshotStore::open_with(&config.database, &config.store_options())
}
