//! Default configuration constants for signrelay.
//!
//! Shared between the TOML config layer and the playback engine so both agree
//! on pacing without duplicating numbers.

/// Default "get ready" buffer before playback waits for a face, in milliseconds.
///
/// Gives the signing partner time to bring the camera up after a message
/// arrives.
pub const DELAY_BEFORE_START_MS: u64 = 2000;

/// Default pause after each fingerspelled letter, in milliseconds.
pub const LETTER_DELAY_MS: u64 = 700;

/// Default scheduling tick in milliseconds (one frame at ~60 Hz).
pub const TICK_MS: u64 = 16;

/// Whether presence starts raised before the detector reports anything.
pub const INITIAL_FACE_DETECTED: bool = true;

/// Upper bound for configured delays, in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Prefix of every letter animation clip.
pub const SYMBOL_PREFIX: &str = "ASL_";

/// Animation clip that returns the avatar to its idle pose.
pub const IDLE_ANIMATION: &str = "Default";

/// Status shown while playback is blocked on the first face detection.
pub const STATUS_WAITING_FOR_FACE: &str = "Waiting for face...";

/// Status shown when the face disappears mid-sentence.
pub const STATUS_FACE_LOST: &str = "Face lost...";

/// Status shown after the last symbol of a sentence has played.
pub const STATUS_DONE: &str = "Done";

/// Local user id used when the config names none.
pub const DEFAULT_USER_ID: &str = "local";

/// Sender id the interactive session posts typed sentences as.
pub const DEMO_PARTNER_ID: &str = "partner";
