//! Command-line interface for signrelay
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Fingerspell sentences on a signing avatar, gated on face presence
#[derive(Parser, Debug)]
#[command(
    name = "signrelay",
    version,
    about = "Fingerspell sentences on a signing avatar, gated on face presence"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Pause per letter (e.g. 700ms, 1s). Spaces pause 1.5x this
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub letter_delay: Option<Duration>,

    /// Buffer before waiting for a face (e.g. 2s, 0)
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub start_delay: Option<Duration>,
}

/// Parse a duration string.
///
/// Bare numbers are seconds (fractions allowed); anything else goes through
/// `humantime` (`700ms`, `2s`, `1m30s`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        if !secs.is_finite() || secs < 0.0 {
            return Err(format!("invalid duration: {s}"));
        }
        return Ok(Duration::from_millis((secs * 1000.0).round() as u64));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play one sentence and exit when it is done
    Play {
        /// Sentence to fingerspell
        sentence: String,

        /// Start with no face detected (playback then waits until Ctrl-C)
        #[arg(long)]
        no_face: bool,
    },

    /// Interactive session: each line is a sentence, /face on|off toggles presence
    Repl,

    /// Print how long a sentence takes to play, excluding the start delay
    Duration {
        /// Sentence to measure
        sentence: String,
    },

    /// Inspect configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}

/// One parsed line of `repl` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Sentence(String),
    Face(bool),
    Stop,
    Status,
    Quit,
    Help,
    Unknown(String),
}

impl ReplCommand {
    /// Parses a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Some(ReplCommand::Sentence(trimmed.to_string()));
        };

        let mut words = command.split_whitespace();
        let parsed = match (words.next(), words.next()) {
            (Some("face"), Some("on")) => ReplCommand::Face(true),
            (Some("face"), Some("off")) => ReplCommand::Face(false),
            (Some("stop"), None) => ReplCommand::Stop,
            (Some("status"), None) => ReplCommand::Status,
            (Some("quit" | "exit"), None) => ReplCommand::Quit,
            (Some("help"), None) => ReplCommand::Help,
            _ => ReplCommand::Unknown(trimmed.to_string()),
        };
        Some(parsed)
    }
}
