use crate::cli::DatesArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::format_date_listing;
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the dates command.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn execute(args: &DatesArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let listing = TrendService::new(&store, config).dates(args.runs)?;
    ctx.emit(&listing, |listing, _| format_date_listing(listing))
}
