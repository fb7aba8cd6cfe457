mod config_cmd;
mod fabric;
mod pattern;
mod project;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use fabric::FabricCommand;
pub use pattern::PatternCommand;
pub use project::ProjectCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks for confirmation on stdin. Returns true when the user typed `y`.
pub(crate) fn confirm(prompt: &str) -> bool {
    use std::io::Write;

    print!("{} [y/N] ", prompt);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
