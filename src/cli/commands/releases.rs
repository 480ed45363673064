use crate::cli::FilterArgs;
use crate::config::TrendsConfig;
use crate::error::Result;
use crate::format::{ReleaseView, format_release};
use crate::output::OutputContext;
use crate::service::TrendService;

/// Execute the releases command.
///
/// # Errors
///
/// Returns an error if any configured release fails to resolve.
pub fn execute(args: &FilterArgs, config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    if config.releases.is_empty() {
        ctx.warning("No releases configured");
    }
    let store = super::open_store(config)?;
    let releases = TrendService::new(&store, config).releases(args.components())?;
    ctx.emit(releases.as_slice(), render)
}

fn render(releases: &[ReleaseView], _width: Option<usize>) -> String {
    releases
        .iter()
        .map(format_release)
        .collect::<Vec<_>>()
        .join("\n")
}
