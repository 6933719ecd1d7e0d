//! Sentence playback engine: turns a sentence into timed letter animations.
//!
//! One session is live at a time. `play_sentence` cancels whatever is running
//! and spawns a new session task that goes through
//! `Scheduled → WaitingForPresence → Playing → Done`. While playing, a
//! countdown task runs next to the letter loop under a child token of the
//! session, so cancelling the session stops both.
//!
//! Every emission takes the slot lock and checks the session generation
//! first. Supersession bumps the generation under the same lock, so after
//! `play_sentence` returns nothing from an older session can reach a sink.

use crate::defaults::{
    DELAY_BEFORE_START_MS, IDLE_ANIMATION, INITIAL_FACE_DETECTED, LETTER_DELAY_MS, STATUS_DONE,
    STATUS_FACE_LOST, STATUS_WAITING_FOR_FACE, TICK_MS,
};
use crate::playback::countdown::{self, Countdown};
use crate::playback::presence::PresenceFlag;
use crate::playback::sink::{AnimationSink, StatusSink};
use crate::playback::symbols::{compute_duration, glyphs, normalize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Pacing of the playback engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Buffer between accepting a sentence and waiting for a face.
    pub delay_before_start: Duration,
    /// Pause after each letter; spaces pause one and a half times this.
    pub letter_delay: Duration,
    /// Scheduling tick for presence polling and the countdown.
    pub tick: Duration,
    /// Presence before the detector reports its first sample.
    pub initial_face_detected: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            delay_before_start: Duration::from_millis(DELAY_BEFORE_START_MS),
            letter_delay: Duration::from_millis(LETTER_DELAY_MS),
            tick: Duration::from_millis(TICK_MS),
            initial_face_detected: INITIAL_FACE_DETECTED,
        }
    }
}

impl PlaybackConfig {
    /// Total pause time of an uninterrupted run of `sentence`.
    pub fn duration_of(&self, sentence: &str) -> Duration {
        compute_duration(sentence, self.letter_delay)
    }
}

/// Where the current session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Nothing submitted yet, or stopped.
    #[default]
    Idle,
    /// Sitting out the start delay.
    Scheduled,
    /// Start delay over, no face seen yet.
    WaitingForPresence,
    /// Letters and countdown running.
    Playing,
    /// Sentence finished and avatar reset.
    Done,
}

/// Point-in-time view of the current session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    /// Upper-cased sentence.
    pub sentence: String,
    /// Index of the character being played (character count once done).
    pub position: usize,
    /// Computed total duration, zero until playback starts.
    pub total: Duration,
}

struct Slot {
    generation: u64,
    token: Option<CancellationToken>,
    snapshot: PlaybackSnapshot,
}

struct Shared {
    config: PlaybackConfig,
    presence: PresenceFlag,
    animation: Option<Arc<dyn AnimationSink>>,
    status: Option<Arc<dyn StatusSink>>,
    slot: Mutex<Slot>,
    phase_tx: watch::Sender<PlaybackPhase>,
    runtime: Handle,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, slot: &mut Slot, phase: PlaybackPhase) {
        slot.snapshot.phase = phase;
        self.phase_tx.send_replace(phase);
        debug!(?phase, generation = slot.generation, "playback phase");
    }

    fn emit_animation(&self, name: &str) {
        match &self.animation {
            Some(sink) => {
                if let Err(e) = sink.play_animation(name) {
                    warn!(sink = sink.name(), clip = name, error = %e, "animation sink failed");
                }
            }
            None => trace!(clip = name, "no animation sink wired; skipping"),
        }
    }

    fn emit_status(&self, text: &str) {
        match &self.status {
            Some(sink) => {
                if let Err(e) = sink.set_status(text) {
                    warn!(sink = sink.name(), status = text, error = %e, "status sink failed");
                }
            }
            None => trace!(status = text, "no status sink wired; skipping"),
        }
    }

    fn emit_caption(&self, text: &str) {
        match &self.status {
            Some(sink) => {
                if let Err(e) = sink.set_caption(text) {
                    warn!(sink = sink.name(), error = %e, "caption update failed");
                }
            }
            None => trace!(caption = text, "no status sink wired; skipping"),
        }
    }
}

/// Builder for [`PlaybackEngine`]; both sinks are optional.
pub struct PlaybackEngineBuilder {
    config: PlaybackConfig,
    animation: Option<Arc<dyn AnimationSink>>,
    status: Option<Arc<dyn StatusSink>>,
}

impl PlaybackEngineBuilder {
    pub fn with_animation_sink(mut self, sink: Arc<dyn AnimationSink>) -> Self {
        self.animation = Some(sink);
        self
    }

    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Builds the engine. Sessions are spawned on `runtime`.
    pub fn build(self, runtime: Handle) -> PlaybackEngine {
        let (phase_tx, _) = watch::channel(PlaybackPhase::Idle);
        PlaybackEngine {
            shared: Arc::new(Shared {
                presence: PresenceFlag::new(self.config.initial_face_detected),
                config: self.config,
                animation: self.animation,
                status: self.status,
                slot: Mutex::new(Slot {
                    generation: 0,
                    token: None,
                    snapshot: PlaybackSnapshot::default(),
                }),
                phase_tx,
                runtime,
            }),
        }
    }
}

/// Handle to the playback engine.
///
/// Cheap to clone; hand a clone to whatever needs to trigger playback.
#[derive(Clone)]
pub struct PlaybackEngine {
    shared: Arc<Shared>,
}

impl PlaybackEngine {
    pub fn builder(config: PlaybackConfig) -> PlaybackEngineBuilder {
        PlaybackEngineBuilder {
            config,
            animation: None,
            status: None,
        }
    }

    /// Engine without sinks. Useful when only the phase is observed.
    pub fn new(config: PlaybackConfig, runtime: Handle) -> Self {
        Self::builder(config).build(runtime)
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    /// Starts playing `sentence`, superseding any session in flight.
    ///
    /// Empty input is ignored. The caption shows the raw sentence and the
    /// status line is cleared before the new session is spawned.
    pub fn play_sentence(&self, sentence: &str) {
        if sentence.is_empty() {
            debug!("ignoring empty sentence");
            return;
        }

        let token = CancellationToken::new();
        let generation = {
            let mut slot = self.shared.lock_slot();
            if let Some(previous) = slot.token.take() {
                previous.cancel();
                info!(generation = slot.generation, "superseding playback session");
            }
            slot.generation += 1;
            slot.token = Some(token.clone());
            slot.snapshot = PlaybackSnapshot {
                sentence: normalize(sentence),
                ..PlaybackSnapshot::default()
            };
            self.shared.set_phase(&mut slot, PlaybackPhase::Scheduled);
            self.shared.emit_caption(&format!(" {sentence}"));
            self.shared.emit_status("");
            slot.generation
        };

        info!(generation, chars = sentence.chars().count(), "playback session accepted");

        let session = Session {
            shared: Arc::clone(&self.shared),
            generation,
            token,
        };
        self.shared.runtime.spawn(session.run(sentence.to_string()));
    }

    /// Cancels the session in flight without starting another.
    ///
    /// No "Done" status and no idle reset, same as supersession.
    pub fn stop(&self) {
        let mut slot = self.shared.lock_slot();
        if let Some(token) = slot.token.take() {
            token.cancel();
            slot.generation += 1;
            self.shared.set_phase(&mut slot, PlaybackPhase::Idle);
            info!("playback stopped");
        }
    }

    /// Updates presence; picked up by the session at its next tick.
    pub fn set_face_detected(&self, detected: bool) {
        let previous = self.shared.presence.set(detected);
        if previous != detected {
            debug!(detected, "face presence changed");
        }
    }

    pub fn face_detected(&self) -> bool {
        self.shared.presence.get()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.shared.lock_slot().snapshot.phase
    }

    /// Receiver that observes every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<PlaybackPhase> {
        self.shared.phase_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.lock_slot().snapshot.clone()
    }
}

/// One live execution of a submitted sentence.
struct Session {
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
}

impl Session {
    /// Runs `f` on the slot if this session still owns it.
    ///
    /// Returns `false` once superseded; callers stop at the first `false`.
    fn with_slot(&self, f: impl FnOnce(&Shared, &mut Slot)) -> bool {
        let mut slot = self.shared.lock_slot();
        if slot.generation != self.generation || self.token.is_cancelled() {
            return false;
        }
        f(&self.shared, &mut slot);
        true
    }

    fn status(&self, text: &str) -> bool {
        self.with_slot(|shared, _| shared.emit_status(text))
    }

    fn enter(&self, phase: PlaybackPhase) -> bool {
        self.with_slot(|shared, slot| shared.set_phase(slot, phase))
    }

    /// Same session, scoped to a child token (for the countdown).
    fn scoped(&self, token: CancellationToken) -> Session {
        Session {
            shared: Arc::clone(&self.shared),
            generation: self.generation,
            token,
        }
    }

    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => !self.token.is_cancelled(),
        }
    }

    async fn wait_for_face(&self) -> bool {
        self.shared
            .presence
            .wait_until_present(self.shared.config.tick, &self.token)
            .await
    }

    async fn run(self, sentence: String) {
        let config = self.shared.config.clone();

        if !self.pause(config.delay_before_start).await {
            return;
        }

        if !self.enter(PlaybackPhase::WaitingForPresence) || !self.status(STATUS_WAITING_FOR_FACE)
        {
            return;
        }
        if !self.wait_for_face().await {
            return;
        }

        let normalized = normalize(&sentence);
        let total = compute_duration(&normalized, config.letter_delay);
        let countdown = Countdown::new(total);
        let started = self.with_slot(|shared, slot| {
            slot.snapshot.total = total;
            shared.set_phase(slot, PlaybackPhase::Playing);
            shared.emit_status(&countdown.label());
        });
        if !started {
            return;
        }

        let countdown_token = self.token.child_token();
        let countdown_session = self.scoped(countdown_token.clone());
        let countdown = tokio::spawn(countdown::run(
            countdown,
            self.shared.presence.clone(),
            config.tick,
            countdown_token.clone(),
            move |label: &str| countdown_session.status(label),
        ));

        let completed = self.play_letters(&normalized, &config).await;

        countdown_token.cancel();
        if let Err(e) = countdown.await {
            warn!(error = %e, "countdown task failed");
        }

        if !completed {
            debug!(generation = self.generation, "playback session cancelled");
            return;
        }

        self.with_slot(|shared, slot| {
            slot.token = None;
            shared.set_phase(slot, PlaybackPhase::Done);
            shared.emit_status(STATUS_DONE);
            shared.emit_animation(IDLE_ANIMATION);
        });
    }

    async fn play_letters(&self, normalized: &str, config: &PlaybackConfig) -> bool {
        let presence = &self.shared.presence;

        for (index, glyph) in glyphs(normalized).enumerate() {
            if !presence.get() {
                if !self.status(STATUS_FACE_LOST) {
                    return false;
                }
                debug!(index, "face lost; holding playback");
                if !self.wait_for_face().await {
                    return false;
                }
            }

            let still_current = self.with_slot(|shared, slot| {
                slot.snapshot.position = index;
                if let Some(name) = glyph.symbol() {
                    shared.emit_animation(&name);
                }
            });
            if !still_current {
                return false;
            }

            let pause = glyph.pause(config.letter_delay);
            if pause.is_zero() {
                continue;
            }
            if !self.pause(pause).await {
                return false;
            }
        }

        let length = normalized.chars().count();
        self.with_slot(|_, slot| slot.snapshot.position = length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RelayError, Result};
    use crate::playback::sink::{PlaybackEvent, RecordingSink};

    fn fast_config() -> PlaybackConfig {
        PlaybackConfig {
            delay_before_start: Duration::from_secs(2),
            letter_delay: Duration::from_millis(700),
            tick: Duration::from_millis(16),
            initial_face_detected: true,
        }
    }

    fn recording_engine(config: PlaybackConfig) -> (PlaybackEngine, RecordingSink) {
        let sink = RecordingSink::new();
        let engine = PlaybackEngine::builder(config)
            .with_animation_sink(Arc::new(sink.clone()))
            .with_status_sink(Arc::new(sink.clone()))
            .build(Handle::current());
        (engine, sink)
    }

    #[test]
    fn default_config_matches_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.delay_before_start, Duration::from_secs(2));
        assert_eq!(config.letter_delay, Duration::from_millis(700));
        assert_eq!(config.tick, Duration::from_millis(16));
        assert!(config.initial_face_detected);
    }

    #[test]
    fn duration_of_uses_letter_delay() {
        let config = fast_config();
        assert_eq!(config.duration_of("ab cd"), Duration::from_millis(3850));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sentence_is_ignored() {
        let (engine, sink) = recording_engine(fast_config());
        engine.play_sentence("");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(sink.events().is_empty());
        assert_eq!(engine.phase(), PlaybackPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_sentence_sets_caption_and_clears_status() {
        let (engine, sink) = recording_engine(fast_config());
        engine.play_sentence("Hi");

        assert_eq!(
            sink.events(),
            vec![
                PlaybackEvent::Caption(" Hi".to_string()),
                PlaybackEvent::Status(String::new()),
            ]
        );
        assert_eq!(engine.phase(), PlaybackPhase::Scheduled);
        assert_eq!(engine.snapshot().sentence, "HI");
    }

    #[tokio::test(start_paused = true)]
    async fn phases_follow_the_lifecycle() {
        let (engine, _sink) = recording_engine(fast_config());
        engine.set_face_detected(false);
        engine.play_sentence("ab");

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(engine.phase(), PlaybackPhase::Scheduled);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.phase(), PlaybackPhase::WaitingForPresence);

        engine.set_face_detected(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        assert_eq!(engine.snapshot().total, Duration::from_millis(1400));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(engine.phase(), PlaybackPhase::Done);
        assert_eq!(engine.snapshot().position, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_phase_reports_done() {
        let (engine, _sink) = recording_engine(fast_config());
        let mut phases = engine.watch_phase();
        engine.play_sentence("a");

        let reached = phases
            .wait_for(|phase| *phase == PlaybackPhase::Done)
            .await
            .map(|phase| *phase);
        assert_eq!(reached.ok(), Some(PlaybackPhase::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_without_done() {
        let (engine, sink) = recording_engine(fast_config());
        engine.play_sentence("hello");

        tokio::time::sleep(Duration::from_millis(2100)).await;
        engine.stop();
        assert_eq!(engine.phase(), PlaybackPhase::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.animations(), vec!["ASL_H"]);
        assert!(!sink.statuses().contains(&STATUS_DONE.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_idle_is_noop() {
        let (engine, sink) = recording_engine(fast_config());
        engine.stop();
        assert_eq!(engine.phase(), PlaybackPhase::Idle);
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_without_any_sink() {
        let engine = PlaybackEngine::new(fast_config(), Handle::current());
        let mut phases = engine.watch_phase();
        engine.play_sentence("ok");

        let reached = phases
            .wait_for(|phase| *phase == PlaybackPhase::Done)
            .await
            .is_ok();
        assert!(reached);
    }

    struct FailingAnimation;

    impl AnimationSink for FailingAnimation {
        fn play_animation(&self, name: &str) -> Result<()> {
            Err(RelayError::Sink {
                sink: "failing".to_string(),
                message: format!("no clip {name}"),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failures_do_not_stop_playback() {
        let status = RecordingSink::new();
        let engine = PlaybackEngine::builder(fast_config())
            .with_animation_sink(Arc::new(FailingAnimation))
            .with_status_sink(Arc::new(status.clone()))
            .build(Handle::current());

        engine.play_sentence("abc");
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(engine.phase(), PlaybackPhase::Done);
        assert_eq!(status.last_status().as_deref(), Some(STATUS_DONE));
    }

    #[tokio::test(start_paused = true)]
    async fn full_countdown_shows_before_first_letter() {
        let (engine, sink) = recording_engine(fast_config());
        engine.set_face_detected(false);
        engine.play_sentence("ab");

        tokio::time::sleep(Duration::from_millis(2100)).await;
        engine.set_face_detected(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 1.4s rounds up to 2s, shown before any letter plays
        let events = sink.events();
        let first_animation = events
            .iter()
            .position(|event| matches!(event, PlaybackEvent::Animation(_)));
        let full_label = events
            .iter()
            .position(|event| *event == PlaybackEvent::Status("2s".to_string()))
            .unwrap();
        assert_eq!(Some(full_label + 1), first_animation, "{events:?}");
        assert_eq!(
            events[..full_label].last(),
            Some(&PlaybackEvent::Status(STATUS_WAITING_FOR_FACE.to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_labels_precede_done() {
        let (engine, sink) = recording_engine(fast_config());
        engine.play_sentence("hi there!");
        tokio::time::sleep(Duration::from_secs(10)).await;

        let statuses = sink.statuses();
        // 7 letters and one space: 5.95s
        assert!(statuses.contains(&"6s".to_string()), "{statuses:?}");
        assert!(statuses.contains(&"1s".to_string()), "{statuses:?}");
        assert_eq!(statuses.last().map(String::as_str), Some(STATUS_DONE));
        assert_eq!(
            statuses.iter().filter(|s| s.as_str() == STATUS_DONE).count(),
            1
        );
    }
}
