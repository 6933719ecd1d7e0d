//! signrelay - Realtime sentence-to-sign playback
//!
//! Fingerspells incoming chat sentences on a signing avatar, paced by fixed
//! delays and gated on whether a face is in view.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod chat;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod playback;
#[cfg(feature = "cli")]
pub mod terminal;

// Engine
pub use playback::{
    AnimationSink, FacePresenceBridge, PlaybackConfig, PlaybackEngine, PlaybackPhase,
    PlaybackSnapshot, PresenceSource, StatusSink, compute_duration,
};

// Relay glue
pub use chat::{
    ChangeFeed, ChatMessage, ChatRelay, ChatSession, IncomingMessageRouter, Lobby, MessageKind,
    MessageRepository, SessionRepository,
};

// Error handling
pub use error::{RelayError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
