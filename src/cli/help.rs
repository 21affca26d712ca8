//! Command-name contract for logging spans.

use crate::cli::parse::Commands;

/// Command name string for log events (e.g. "plan", "hashes").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Plan { .. } => "plan",
        Commands::Hashes { .. } => "hashes",
        Commands::Hash { .. } => "hash",
        Commands::Config { .. } => "config",
    }
}
