use crate::config::TrendsConfig;
use crate::error::Result;
use crate::output::OutputContext;

/// Execute the config command: print the effective configuration.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn execute(config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        return ctx.json_pretty(config);
    }
    ctx.print(&serde_yaml::to_string(config)?);
    Ok(())
}
