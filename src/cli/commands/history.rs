use crate::cli::FilterArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_series;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the history command.
///
/// # Errors
///
/// Returns an error if any breakdown query fails.
pub fn execute(args: &FilterArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let series = TrendService::new(&store, config).history(args.components())?;
    ctx.emit(&series, |series, _| format_series(series))
}
