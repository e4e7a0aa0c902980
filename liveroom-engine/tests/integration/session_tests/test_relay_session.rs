use crate::integration::init_tracing;
use crate::utils::*;
use liveroom_core::TrackKind;
use liveroom_engine::media::TrackSource;
use liveroom_engine::{EngineEvent, EngineHandle, EngineSnapshot, LinkState};
use std::time::Duration;
use tokio::time::timeout;

async fn wait(handle: &EngineHandle, pred: impl FnMut(&EngineSnapshot) -> bool) -> EngineSnapshot {
    timeout(Duration::from_millis(ENGINE_TIMEOUT_MS), handle.wait_for(pred))
        .await
        .expect("timed out waiting for engine state")
        .expect("engine stopped")
}

async fn two_stable_peers(relay: &TestRelay) -> (RelayPeer, RelayPeer) {
    let u1 = relay.connect("u1");
    wait(&u1.handle, |s| s.is_host).await;
    let u2 = relay.connect("u2");

    wait(&u1.handle, |s| s.link_state(&id("u2")) == Some(LinkState::Stable)).await;
    wait(&u2.handle, |s| s.link_state(&id("u1")) == Some(LinkState::Stable)).await;
    (u1, u2)
}

#[tokio::test]
async fn test_two_engines_negotiate_once() {
    init_tracing();
    let relay = TestRelay::new();
    let (u1, u2) = two_stable_peers(&relay).await;

    let t1 = u1.factory.latest(&id("u2")).expect("u1 transport");
    let t2 = u2.factory.latest(&id("u1")).expect("u2 transport");
    assert_eq!(t1.local_description(), t2.remote_description());
    assert_eq!(t1.remote_description(), t2.local_description());
    assert_eq!(t1.offers_created(), 1);
    assert_eq!(t2.offers_created(), 0);

    let s2 = u2.handle.snapshot();
    assert_eq!(s2.host_id, Some(id("u1")));
    assert!(!s2.is_host);
    assert!(s2.participant(&id("u1")).is_some_and(|p| p.is_host));
}

#[tokio::test]
async fn test_capability_toggle_reaches_peer_without_renegotiation() {
    init_tracing();
    let relay = TestRelay::new();
    let (u1, u2) = two_stable_peers(&relay).await;

    u1.handle.set_capability(TrackKind::Audio, false).await;

    wait(&u2.handle, |s| {
        s.participant(&id("u1")).is_some_and(|p| !p.audio_enabled)
    })
    .await;
    assert!(!u1.handle.snapshot().audio_enabled);
    let mic = u1
        .capture
        .latest(TrackSource::Microphone)
        .expect("u1 microphone");
    assert!(!mic.is_enabled());
    assert_eq!(
        u1.factory.latest(&id("u2")).expect("transport").offers_created(),
        1
    );
}

#[tokio::test]
async fn test_host_mute_silences_target() {
    init_tracing();
    let relay = TestRelay::new();
    let (u1, u2) = two_stable_peers(&relay).await;

    u1.handle.mute(id("u2")).await;

    wait(&u2.handle, |s| !s.audio_enabled).await;
    wait(&u1.handle, |s| {
        s.participant(&id("u2")).is_some_and(|p| !p.audio_enabled)
    })
    .await;
    let mic = u2
        .capture
        .latest(TrackSource::Microphone)
        .expect("u2 microphone");
    assert!(!mic.is_enabled());
}

#[tokio::test]
async fn test_chat_and_departure() {
    init_tracing();
    let relay = TestRelay::new();
    let (mut u1, u2) = two_stable_peers(&relay).await;

    u2.handle.send_chat("hello from u2").await;
    let event = timeout(Duration::from_millis(ENGINE_TIMEOUT_MS), async {
        loop {
            if let Ok(EngineEvent::ChatReceived(m)) = u1.events.recv().await
                && !m.is_own
            {
                return m;
            }
        }
    })
    .await
    .expect("chat reaches u1");
    assert_eq!(event.from, id("u2"));
    assert_eq!(event.username, "name-u2");

    u2.handle.leave().await;
    let snapshot = wait(&u1.handle, |s| s.roster.is_empty() && s.links.is_empty()).await;
    assert!(!snapshot.ended);
}
