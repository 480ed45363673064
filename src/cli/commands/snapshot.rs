use crate::cli::DateArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_snapshot;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the snapshot command.
///
/// # Errors
///
/// Returns an error if the date has no snapshot or a query fails.
pub fn execute(args: &DateArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let snapshot =
        TrendService::new(&store, config).snapshot(&args.date, args.filter.components())?;
    ctx.emit(&snapshot, format_snapshot)
}
