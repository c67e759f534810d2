//! Queue command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use super::DEFAULT_QUEUE;
use crate::api::ApiClient;
use crate::config::Config;

/// Queue subcommands
#[derive(Subcommand)]
pub enum QueueCommands {
    /// Show the number of jobs per state
    Counts {
        /// Queue name
        #[arg(default_value = DEFAULT_QUEUE)]
        name: String,
    },
}

/// Handle queue commands
pub async fn handle_queue_command(command: QueueCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.api_url);

    match command {
        QueueCommands::Counts { name } => {
            let counts = client.queue_counts(&name).await?;

            println!("{}", format!("Queue {}:", name).bold());
            println!("  Waiting:   {}", counts.waiting.to_string().yellow());
            println!("  Delayed:   {}", counts.delayed.to_string().yellow());
            println!("  Active:    {}", counts.active.to_string().cyan());
            println!("  Completed: {}", counts.completed.to_string().green());
            println!("  Failed:    {}", counts.failed.to_string().red());
            Ok(())
        }
    }
}
