//! Stop command - bring the telemetry stack down.

use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub async fn execute(ctx: &Context) -> anyhow::Result<()> {
    output::info("Stopping telemetry stack...");
    ctx.lifecycle().stop().await.map_err(CliError::from)?;
    output::success("Telemetry stack stopped");
    Ok(())
}
