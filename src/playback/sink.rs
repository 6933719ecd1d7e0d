use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Avatar output: plays one named animation clip.
///
/// Fire-and-forget. A returned error is logged by the engine and playback
/// carries on. Implementations must not call back into the engine.
pub trait AnimationSink: Send + Sync {
    /// Play the clip `name` (`ASL_<letter>` or the idle clip `Default`).
    fn play_animation(&self, name: &str) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "animation"
    }
}

/// Text output for the countdown line and the caption line.
pub trait StatusSink: Send + Sync {
    /// Replace the countdown/status line.
    fn set_status(&self, text: &str) -> Result<()>;

    /// Replace the caption line showing the sentence being signed.
    fn set_caption(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "status"
    }
}

/// One emission, in the order the engine produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Animation(String),
    Status(String),
    Caption(String),
}

/// Records every emission on a single timeline.
///
/// Clones share the same log, so one clone can be handed to the engine as
/// both sinks while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<PlaybackEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All events so far.
    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.log().clone()
    }

    /// Animation clip names only.
    pub fn animations(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::Animation(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Status lines only.
    pub fn statuses(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent status line, if any.
    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    pub fn clear(&self) {
        self.log().clear();
    }
}

impl AnimationSink for RecordingSink {
    fn play_animation(&self, name: &str) -> Result<()> {
        self.log().push(PlaybackEvent::Animation(name.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl StatusSink for RecordingSink {
    fn set_status(&self, text: &str) -> Result<()> {
        self.log().push(PlaybackEvent::Status(text.to_string()));
        Ok(())
    }

    fn set_caption(&self, text: &str) -> Result<()> {
        self.log().push(PlaybackEvent::Caption(text.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
