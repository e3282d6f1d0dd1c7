//! CLI Module
//!
//! Command-line interface for inspecting and editing animator controller
//! asset files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Animator controller editor - edit state machines stored in controller files
#[derive(Parser, Debug)]
#[command(name = "animctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Editor configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the write-back debounce window, in milliseconds
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a summary of one layer's state machine
    #[command(name = "inspect")]
    Inspect {
        /// Path to the controller asset
        asset: PathBuf,

        /// Layer to inspect
        #[arg(short, long, default_value_t = 0)]
        layer: usize,
    },

    /// Rebuild a layer and save the normalized asset
    #[command(name = "rebuild")]
    Rebuild {
        /// Path to the controller asset
        asset: PathBuf,

        /// Layer to rebuild
        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        /// Where to save the result (defaults to the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a state to a layer
    #[command(name = "add-state")]
    AddState {
        /// Path to the controller asset
        asset: PathBuf,

        /// Name of the new state (made unique if taken)
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Connect two states. `entry`, `any` and `exit` name the pseudo-states
    #[command(name = "add-transition")]
    AddTransition {
        /// Path to the controller asset
        asset: PathBuf,

        /// Source state name
        #[arg(long)]
        from: String,

        /// Destination state name
        #[arg(long)]
        to: String,

        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a state and every transition touching it
    #[command(name = "remove-state")]
    RemoveState {
        /// Path to the controller asset
        asset: PathBuf,

        /// Name of the state to remove
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that every layer rebuilds without dropping transitions
    #[command(name = "validate")]
    Validate {
        /// Path to the controller asset
        asset: PathBuf,
    },
}
