//! Remaining-time display that runs alongside letter playback.
//!
//! The clock only consumes time on ticks where a face is visible. On ticks
//! without a face the elapsed time is dropped and nothing is displayed, so the
//! last shown number stays frozen until the face returns.

use crate::playback::presence::PresenceFlag;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Pure countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
}

impl Countdown {
    pub fn new(total: Duration) -> Self {
        Self { remaining: total }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Label for the current remaining time.
    pub fn label(&self) -> String {
        format_remaining(self.remaining)
    }

    /// Advances one tick. Returns the label to show, or `None` when no face
    /// was visible and the clock stood still.
    pub fn tick(&mut self, elapsed: Duration, face_detected: bool) -> Option<String> {
        if !face_detected {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        Some(format_remaining(self.remaining))
    }
}

/// Whole seconds rounded up, suffixed with `s` (e.g. `1.2s` → `"2s"`).
pub fn format_remaining(remaining: Duration) -> String {
    let whole = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("{whole}s")
}

/// Ticks `countdown` until it finishes or `token` is cancelled.
///
/// `emit` returns `false` once its session has been superseded, which ends
/// the loop as well.
pub(crate) async fn run(
    mut countdown: Countdown,
    presence: PresenceFlag,
    tick: Duration,
    token: CancellationToken,
    mut emit: impl FnMut(&str) -> bool + Send,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;
    let mut last = Instant::now();

    while !countdown.is_finished() {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last);
        last = now;

        if let Some(label) = countdown.tick(elapsed, presence.get())
            && !emit(&label)
        {
            return;
        }
    }
}
