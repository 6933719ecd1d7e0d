//! Chat relay to playback, through the in-memory backend.

use signrelay::chat::{ChangeFeed, ChatRelay, InMemoryRelay, IncomingMessageRouter, MessageKind};
use signrelay::defaults::IDLE_ANIMATION;
use signrelay::playback::{PlaybackConfig, PlaybackEngine, PlaybackPhase, RecordingSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const SESSION: &str = "room-7";

struct Harness {
    engine: PlaybackEngine,
    sink: RecordingSink,
    relay: InMemoryRelay,
    token: CancellationToken,
    router: tokio::task::JoinHandle<()>,
}

async fn harness() -> Harness {
    let sink = RecordingSink::new();
    let engine = PlaybackEngine::builder(PlaybackConfig::default())
        .with_animation_sink(Arc::new(sink.clone()))
        .with_status_sink(Arc::new(sink.clone()))
        .build(Handle::current());

    let relay = InMemoryRelay::new();
    let feed = relay.subscribe(SESSION).await.unwrap();
    let token = CancellationToken::new();
    let router = IncomingMessageRouter::new(engine.clone(), SESSION, "signer");
    let router = tokio::spawn(router.run(feed, token.clone()));

    Harness {
        engine,
        sink,
        relay,
        token,
        router,
    }
}

#[tokio::test(start_paused = true)]
async fn partner_text_is_signed() {
    let h = harness().await;
    let partner = ChatRelay::new(Arc::new(h.relay.clone()), SESSION, "speaker");

    partner.send(MessageKind::TextToSign, "  no  ").await.unwrap();
    sleep(Duration::from_secs(10)).await;

    assert_eq!(
        h.sink.animations(),
        vec!["ASL_N".to_string(), "ASL_O".to_string(), IDLE_ANIMATION.to_string()]
    );
    assert_eq!(h.engine.phase(), PlaybackPhase::Done);

    h.token.cancel();
    h.router.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn own_and_non_sign_messages_are_not_played() {
    let h = harness().await;
    let me = ChatRelay::new(Arc::new(h.relay.clone()), SESSION, "signer");
    let partner = ChatRelay::new(Arc::new(h.relay.clone()), SESSION, "speaker");

    me.send(MessageKind::TextToSign, "mine").await.unwrap();
    partner
        .send(MessageKind::TextToSpeech, "say this")
        .await
        .unwrap();
    partner
        .send(MessageKind::SpeechAudio, "clip.wav")
        .await
        .unwrap();
    sleep(Duration::from_secs(10)).await;

    assert!(h.sink.events().is_empty());
    assert_eq!(h.engine.phase(), PlaybackPhase::Idle);
    assert_eq!(partner.history().await.unwrap().len(), 3);

    h.relay.close();
    h.router.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn other_sessions_do_not_reach_the_engine() {
    let h = harness().await;
    let elsewhere = ChatRelay::new(Arc::new(h.relay.clone()), "room-8", "speaker");

    elsewhere.send(MessageKind::TextToSign, "hey").await.unwrap();
    sleep(Duration::from_secs(10)).await;

    assert!(h.sink.animations().is_empty());

    h.token.cancel();
    h.router.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn latest_partner_message_wins() {
    let h = harness().await;
    let partner = ChatRelay::new(Arc::new(h.relay.clone()), SESSION, "speaker");

    partner.send(MessageKind::TextToSign, "first").await.unwrap();
    sleep(Duration::from_millis(500)).await;
    partner.send(MessageKind::TextToSign, "ok").await.unwrap();
    sleep(Duration::from_secs(10)).await;

    assert_eq!(
        h.sink.animations(),
        vec!["ASL_O".to_string(), "ASL_K".to_string(), IDLE_ANIMATION.to_string()]
    );
    assert_eq!(h.engine.snapshot().sentence, "OK");

    h.token.cancel();
    h.router.await.unwrap();
}
