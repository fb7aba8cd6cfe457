use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod db;
mod sync;

use commands::{ConfigCommand, FabricCommand, PatternCommand, ProjectCommand, SyncCommand};
use config::Config;
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "stitch")]
#[command(version)]
#[command(about = "A sewing project and fabric stash tracking CLI", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sewing projects
    Project(ProjectCommand),

    /// Manage sewing patterns
    Pattern(PatternCommand),

    /// Manage the fabric stash
    Fabric(FabricCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Sync with remote server
    Sync(SyncCommand),
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    // Auto-sync BEFORE read commands
    if is_read_command(&cli.command) {
        try_auto_sync(&config);
    }

    // Execute the command
    let result = execute_command(&cli.command, &config);

    // Auto-sync AFTER write commands (only if command succeeded)
    if result.is_ok() && is_write_command(&cli.command) {
        try_auto_sync(&config);
    }

    result
}

fn execute_command(
    command: &Option<Commands>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Project(cmd)) => cmd.run(config),
        Some(Commands::Pattern(cmd)) => cmd.run(config),
        Some(Commands::Fabric(cmd)) => cmd.run(config),
        Some(Commands::Config(cmd)) => cmd.run(config),
        Some(Commands::Sync(cmd)) => cmd.run(config),
        None => {
            println!("stitchkit {}", stitch_kit_core::version());
            println!("Run 'stitch --help' for usage.");
            Ok(())
        }
    }
}

fn is_read_command(command: &Option<Commands>) -> bool {
    match command {
        Some(Commands::Project(cmd)) => cmd.is_read(),
        Some(Commands::Pattern(cmd)) => cmd.is_read(),
        Some(Commands::Fabric(cmd)) => cmd.is_read(),
        _ => false,
    }
}

fn is_write_command(command: &Option<Commands>) -> bool {
    match command {
        Some(Commands::Project(cmd)) => cmd.is_write(),
        Some(Commands::Pattern(cmd)) => cmd.is_write(),
        Some(Commands::Fabric(cmd)) => cmd.is_write(),
        _ => false,
    }
}
