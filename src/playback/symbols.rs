//! Sentence normalization and per-character pacing.
//!
//! A sentence is upper-cased once, then walked character by character. Each
//! character maps to a [`Glyph`], which decides both the animation clip (if
//! any) and how long playback pauses afterwards. [`compute_duration`] sums the
//! same pauses, so the countdown starts from exactly the time an uninterrupted
//! run will spend.

use crate::defaults::SYMBOL_PREFIX;
use std::time::Duration;

/// What one character of a normalized sentence turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Alphabetic character: one animation clip, then a letter pause.
    Letter(char),
    /// Word gap: a longer pause, no clip.
    Space,
    /// Punctuation, digits, tabs, newlines: no clip and no pause.
    Skip,
}

impl Glyph {
    /// Classify an already upper-cased character.
    pub fn classify(c: char) -> Self {
        if c.is_alphabetic() {
            Glyph::Letter(c)
        } else if c == ' ' {
            Glyph::Space
        } else {
            Glyph::Skip
        }
    }

    /// Pause that follows this glyph during playback.
    pub fn pause(self, letter_delay: Duration) -> Duration {
        match self {
            Glyph::Letter(_) => letter_delay,
            Glyph::Space => space_delay(letter_delay),
            Glyph::Skip => Duration::ZERO,
        }
    }

    /// Animation clip name, `None` for glyphs that play nothing.
    pub fn symbol(self) -> Option<String> {
        match self {
            Glyph::Letter(c) => Some(symbol_name(c)),
            Glyph::Space | Glyph::Skip => None,
        }
    }
}

/// Clip name for a letter, e.g. `ASL_H`.
pub fn symbol_name(letter: char) -> String {
    format!("{SYMBOL_PREFIX}{letter}")
}

/// Spaces pause one and a half letter delays.
///
/// Integer arithmetic keeps the sum in [`compute_duration`] exact.
/// Saturates at [`Duration::MAX`].
pub fn space_delay(letter_delay: Duration) -> Duration {
    letter_delay.saturating_mul(3) / 2
}

/// Upper-case a sentence the way playback walks it.
pub fn normalize(sentence: &str) -> String {
    sentence.to_uppercase()
}

/// Glyphs of a sentence in playback order.
pub fn glyphs(sentence: &str) -> impl Iterator<Item = Glyph> + '_ {
    sentence.chars().map(Glyph::classify)
}

/// Total time an uninterrupted playback of `sentence` spends pausing.
///
/// Accepts raw input; normalization happens here too. Saturates instead of
/// overflowing.
pub fn compute_duration(sentence: &str, letter_delay: Duration) -> Duration {
    glyphs(&normalize(sentence))
        .map(|glyph| glyph.pause(letter_delay))
        .fold(Duration::ZERO, Duration::saturating_add)
}
