use crate::config::TrendsConfig;
use crate::error::Result;
use crate::output::OutputContext;
use serde_json::json;

/// Execute the prune command.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn execute(config: &TrendsConfig, ctx: &OutputContext) -> Result<()> {
    let store = super::open_store(config)?;
    let pruned = store.prune_superseded()?;
    if ctx.is_json() {
        return ctx.json_pretty(&json!({ "pruned": pruned }));
    }
    ctx.success(&format!("Pruned {pruned} superseded row(s)"));
    Ok(())
}
