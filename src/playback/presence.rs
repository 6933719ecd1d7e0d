//! Face presence: the shared flag the engine gates on, and the per-tick
//! adapter that feeds it from a detector.

use crate::playback::engine::PlaybackEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Process-wide "a face is visible" flag.
///
/// Single writer (the detector adapter), many readers (the playback tasks).
/// Plain load/store, no read-modify-write on the reader side.
#[derive(Debug, Clone)]
pub struct PresenceFlag(Arc<AtomicBool>);

impl PresenceFlag {
    pub fn new(initial: bool) -> Self {
        Self(Arc::new(AtomicBool::new(initial)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Stores the new value and returns the previous one.
    pub fn set(&self, detected: bool) -> bool {
        self.0.swap(detected, Ordering::AcqRel)
    }

    /// Suspends until the flag is raised, re-checking once per tick.
    ///
    /// Returns `false` if `token` was cancelled first.
    pub(crate) async fn wait_until_present(
        &self,
        tick: Duration,
        token: &CancellationToken,
    ) -> bool {
        if self.get() {
            return !token.is_cancelled();
        }

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return false,
                _ = ticker.tick() => {
                    if self.get() {
                        return true;
                    }
                }
            }
        }
    }
}

/// A face detector sampled once per tick.
pub trait PresenceSource: Send + Sync {
    /// `Some(visible)` for a fresh sample, `None` while the detector is not
    /// wired up yet (the tick is skipped).
    fn face_visible(&self) -> Option<bool>;
}

impl<F> PresenceSource for F
where
    F: Fn() -> Option<bool> + Send + Sync,
{
    fn face_visible(&self) -> Option<bool> {
        self()
    }
}

/// Polls a [`PresenceSource`] every tick and forwards samples to the engine.
pub struct FacePresenceBridge<S: PresenceSource> {
    source: S,
    engine: PlaybackEngine,
    tick: Duration,
    last: Option<bool>,
}

impl<S: PresenceSource> FacePresenceBridge<S> {
    /// Creates a bridge ticking at the engine's configured rate.
    pub fn new(source: S, engine: PlaybackEngine) -> Self {
        let tick = engine.config().tick;
        Self {
            source,
            engine,
            tick,
            last: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Forwards one sample. Returns the value forwarded, if any.
    pub fn poll_once(&mut self) -> Option<bool> {
        let visible = self.source.face_visible()?;
        if self.last != Some(visible) {
            debug!(visible, "face detector sample changed");
            self.last = Some(visible);
        }
        self.engine.set_face_detected(visible);
        Some(visible)
    }

    /// Runs until `token` is cancelled.
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once();
                }
            }
        }
        debug!("face presence bridge stopped");
    }
}
