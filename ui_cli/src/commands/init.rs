//! Init command - allocate ports and write the stack configuration.

use clap::Args;

use stack_core::{provision, LoopbackCheck, WriteMode};
use stack_shared_types::default_services;
use state_store_interface::StateStore;

use crate::commands::status::{port_rows, print_endpoints};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{self, print_data, section};
use crate::OutputFormat;

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing stack, including its ports and token
    #[arg(long)]
    force: bool,
}

/// Execute the init command.
pub async fn execute(args: InitArgs, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    let mode = if args.force {
        WriteMode::Force
    } else {
        WriteMode::RefuseExisting
    };

    output::info(&format!("Provisioning telemetry stack in {}", ctx.paths.root.display()));
    let outcome = provision(
        ctx.store.as_ref(),
        &ctx.paths,
        &ctx.config,
        default_services(),
        LoopbackCheck,
        mode,
    )
    .await
    .map_err(CliError::from)?;

    output::success("A2A initialized");
    for path in &outcome.written {
        output::field("Wrote", &path.display().to_string());
    }
    output::field("State", &ctx.store.location().display().to_string());

    section("Ports");
    print_data(&port_rows(default_services(), &outcome.state), format)?;

    section("Endpoints");
    print_endpoints(&outcome.state);

    output::info("Next: run `a2a link` in each agent project, then `a2a start-dashboard`");
    Ok(())
}
