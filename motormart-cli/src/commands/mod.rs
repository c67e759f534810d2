//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod order;
mod queue;

pub use job::JobCommands;
pub use order::OrderCommands;
pub use queue::QueueCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Queue used when `--queue` is not given
pub const DEFAULT_QUEUE: &str = "orderQueue";

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Order submission and lookup
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Job inspection and retry
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Queue statistics
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Order { command } => order::handle_order_command(command, config).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Queue { command } => queue::handle_queue_command(command, config).await,
    }
}
