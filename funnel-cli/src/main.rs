use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "funnel", about = "Inspect onboarding funnel routing, paywall variants and tracking")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Check a navigation between two funnel steps
    Route(commands::route::RouteArgs),
    /// Walk a user through the funnel and persist the tracked session
    Simulate(commands::simulate::SimulateArgs),
    /// Paywall variant assignment
    Variant(commands::variant::VariantArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Route(args) => commands::route::run(args),
        Commands::Simulate(args) => commands::simulate::run(args).await,
        Commands::Variant(args) => commands::variant::run(args),
    }
}
