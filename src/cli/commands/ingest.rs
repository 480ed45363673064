use super::open_store;
use crate::cli::IngestArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_replace_outcome;
use crate::ingest::SnapshotIngestor;
use crate::output::OutputContext;
use crate::util::{parse_day, today_utc};
use std::io;
use tracing::info;

/// Execute the ingest command.
///
/// # Errors
///
/// Returns an error if the date or payload is invalid, or the store write fails.
pub fn execute(args: &IngestArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let date = match &args.date {
        Some(value) => parse_day(value)?,
        None => today_utc(),
    };
    let store = open_store(config)?;
    let ingestor = SnapshotIngestor::new(&store);

    let outcome = if args.input.as_os_str() == "-" {
        ingestor.ingest_reader(date, io::stdin().lock())?
    } else {
        ingestor.ingest_path(date, &args.input)?
    };
    info!(
        %date,
        generation = outcome.generation,
        inserted = outcome.inserted,
        replaced = outcome.replaced,
        "Snapshot recorded"
    );

    ctx.emit(&outcome, |outcome, _| format_replace_outcome(outcome))
}
