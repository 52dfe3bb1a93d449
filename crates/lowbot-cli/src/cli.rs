//! CLI argument definitions for LowBot.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file.
pub const DEFAULT_CONFIG: &str = "config/lowbot.toml";

/// LowBot -- a conversational bot dispatcher.
#[derive(Parser)]
#[command(
    name = "lowbot",
    version,
    about = "LowBot -- intent-driven chat bot",
    long_about = "Classifies chat messages into intents, routes each one to the first \
                  skill that can handle it, and delivers the reply through the \
                  originating adapter."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot and chat with it in the terminal.
    Run {
        /// Channel name attached to terminal messages.
        #[arg(long, default_value = "terminal")]
        channel: String,

        /// Author name attached to terminal messages.
        #[arg(long, default_value = "you")]
        author: String,

        /// Locale attached to terminal messages (e.g. `en`, `fr`).
        #[arg(long)]
        locale: Option<String>,
    },

    /// Validate the configuration and report what would be loaded.
    Check,

    /// Classify a piece of text and print the result.
    Classify {
        /// The text to classify.
        #[arg(required = true)]
        text: Vec<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}
