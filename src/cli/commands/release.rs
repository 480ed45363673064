use crate::cli::ReleaseArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_release;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the release command.
///
/// # Errors
///
/// Returns an error for an unknown release, an invalid window, or a failed query.
pub fn execute(args: &ReleaseArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let release = TrendService::new(&store, config).release(&args.name, args.filter.components())?;
    ctx.emit(&release, |release, _| format_release(release))
}
