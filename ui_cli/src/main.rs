//! a2a - local telemetry stack for multi-agent systems.
//!
//! Provisions a collector, Prometheus, Loki and Tempo through docker compose,
//! links agent projects to it and serves the dashboard.

mod commands;
mod context;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use observability::TracingConfig;

use crate::commands::{init, inject_otel, link, start_dashboard, status, stop};
use crate::context::Context;

#[derive(Parser)]
#[command(name = "a2a", version, about = "A2A agent telemetry CLI")]
struct Cli {
    /// Data directory holding the stack state and generated configs
    #[arg(long, global = true, env = stack_config::HOME_ENV)]
    home: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate ports and write the stack configuration
    Init(init::InitArgs),
    /// Link the current project as an agent
    Link(link::LinkArgs),
    /// Write OpenTelemetry setup instructions into the current project
    InjectOtel,
    /// Start the telemetry stack and serve the dashboard
    StartDashboard,
    /// Stop the telemetry stack
    Stop,
    /// Show ports, endpoints and linked agents
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let tracing = match cli.command {
        Commands::StartDashboard => TracingConfig::default(),
        _ => TracingConfig::cli(),
    };
    if let Err(e) = observability::init_tracing(tracing.with_json(cli.log_json)) {
        output::warn(&e.to_string());
    }

    if let Err(e) = run(cli).await {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(cli.home.as_deref())?;

    match cli.command {
        Commands::Init(args) => init::execute(args, &ctx, cli.format).await,
        Commands::Link(args) => link::execute(args, &ctx).await,
        Commands::InjectOtel => inject_otel::execute().await,
        Commands::StartDashboard => start_dashboard::execute(&ctx).await,
        Commands::Stop => stop::execute(&ctx).await,
        Commands::Status => status::execute(&ctx, cli.format).await,
    }
}
