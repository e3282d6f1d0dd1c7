//! animctl - Animator Controller Editor
//!
//! Command-line interface for editing animator controller state machines.

use clap::Parser;
use env_logger::Env;
use log::info;

use animator_editor::cli::commands;
use animator_editor::cli::{Cli, Commands};
use animator_editor::config::EditorConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Animator Controller Editor v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref(), cli.debounce_ms)?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Animator Controller Editor v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &EditorConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Inspect { asset, layer } => commands::inspect(&asset, layer, config),
        Commands::Rebuild {
            asset,
            layer,
            output,
        } => commands::rebuild(&asset, layer, output.as_deref(), config),
        Commands::AddState {
            asset,
            name,
            layer,
            output,
        } => commands::add_state(&asset, &name, layer, output.as_deref(), config),
        Commands::AddTransition {
            asset,
            from,
            to,
            layer,
            output,
        } => commands::add_transition(&asset, &from, &to, layer, output.as_deref(), config),
        Commands::RemoveState {
            asset,
            name,
            layer,
            output,
        } => commands::remove_state(&asset, &name, layer, output.as_deref(), config),
        Commands::Validate { asset } => {
            let problems = commands::validate(&asset, config)?;
            if problems > 0 {
                anyhow::bail!("{} transitions would be dropped on rebuild", problems);
            }
            Ok(())
        }
    }
}
