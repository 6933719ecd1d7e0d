//! Realtime sentence-to-sign playback.
//!
//! A sentence is fingerspelled letter by letter on an avatar, paced by fixed
//! delays and gated on a live face-presence signal. A newer sentence always
//! replaces the one in flight.

pub mod countdown;
pub mod engine;
pub mod presence;
pub mod sink;
pub mod symbols;

pub use countdown::{Countdown, format_remaining};
pub use engine::{
    PlaybackConfig, PlaybackEngine, PlaybackEngineBuilder, PlaybackPhase, PlaybackSnapshot,
};
pub use presence::{FacePresenceBridge, PresenceFlag, PresenceSource};
pub use sink::{AnimationSink, PlaybackEvent, RecordingSink, StatusSink};
pub use symbols::{Glyph, compute_duration, normalize, symbol_name};
