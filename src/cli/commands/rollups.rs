use crate::cli::FilterArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_series;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the rollups command.
///
/// # Errors
///
/// Returns an error if the store is empty or the date list cannot be read.
pub fn execute(args: &FilterArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let series = TrendService::new(&store, config).rollups(args.components())?;
    ctx.emit(&series, |series, _| format_series(series))
}
