//! Motormart CLI
//!
//! Command-line interface for submitting orders and operating the order queue.

mod api;
mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "motormart")]
#[command(about = "Motormart order and queue CLI", long_about = None)]
struct Cli {
    /// API URL
    #[arg(long, env = "MOTORMART_API_URL", default_value = "http://localhost:9898")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
    };

    handle_command(cli.command, &config).await
}
