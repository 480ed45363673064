use crate::cli::DateArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_issue_list;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the issues command.
///
/// # Errors
///
/// Returns an error if the date has no snapshot or the query fails.
pub fn execute(args: &DateArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let issues = TrendService::new(&store, config).issues(&args.date, args.filter.components())?;
    ctx.emit(issues.as_slice(), format_issue_list)
}
