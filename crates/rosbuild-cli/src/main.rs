//! rosbuild CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rosbuild")]
#[command(about = "ROS testbuild CI configuration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a jobs file by assembling every job
    Validate {
        /// Path to the jobs file
        #[arg(default_value = "rosbuild.kdl")]
        path: String,
        /// Also render secrets and configure change sources
        #[arg(long)]
        render_secrets: bool,
    },
    /// Print the assembled job topology
    Show {
        /// Path to the jobs file
        #[arg(default_value = "rosbuild.kdl")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            path,
            render_secrets,
        } => commands::validate::validate(&path, render_secrets).await,
        Commands::Show { path } => commands::show::show(&path),
    }
}
