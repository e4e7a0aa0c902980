use crate::integration::init_tracing;
use crate::utils::*;
use liveroom_core::{SessionDescription, SignalBody, TrackKind};
use liveroom_engine::media::TrackSource;
use liveroom_engine::{EngineEvent, LinkState};

async fn sharing_harness() -> EngineHarness {
    let mut h = EngineHarness::start("u1").await;
    h.join_room(&["u2"], false, Some("u2")).await;
    h.expect_sent("offer").await.expect("offer");
    h.deliver(
        from("u2", SignalBody::Answer(SessionDescription::answer("answer from u2")))
            .addressed_to(id("u1")),
    )
    .await;
    h.wait_state(|s| s.link_state(&id("u2")) == Some(LinkState::Stable))
        .await
        .expect("stable");

    h.handle.toggle_screen_share().await;
    h.expect_event(|e| matches!(e, EngineEvent::ScreenShareChanged(true)))
        .await
        .expect("sharing started");
    h
}

fn last_video_replacement(h: &EngineHarness) -> Option<String> {
    h.factory
        .latest(&id("u2"))
        .expect("transport")
        .calls()
        .into_iter()
        .rev()
        .find_map(|c| match c {
            TransportCall::ReplaceTrack(TrackKind::Video, track) => Some(track),
            _ => None,
        })
}

#[tokio::test]
async fn test_screen_replaces_camera_without_offer() {
    init_tracing();
    let h = sharing_harness().await;

    let screen = h.capture.latest(TrackSource::Screen).expect("screen");
    assert_eq!(last_video_replacement(&h), Some(screen.id().to_owned()));
    assert_eq!(
        h.factory.latest(&id("u2")).expect("transport").offers_created(),
        1
    );
    h.wait_state(|s| s.screen_sharing)
        .await
        .expect("sharing flag set");
}

#[tokio::test]
async fn test_stopping_share_restores_camera() {
    init_tracing();
    let mut h = sharing_harness().await;

    h.handle.toggle_screen_share().await;
    h.expect_event(|e| matches!(e, EngineEvent::ScreenShareChanged(false)))
        .await
        .expect("sharing stopped");

    let camera = h.capture.latest(TrackSource::Camera).expect("camera");
    let screen = h.capture.latest(TrackSource::Screen).expect("screen");
    assert_eq!(last_video_replacement(&h), Some(camera.id().to_owned()));
    assert!(!screen.is_enabled());
    assert!(!h.handle.snapshot().screen_sharing);
}

#[tokio::test]
async fn test_ended_screen_source_reverts_automatically() {
    init_tracing();
    let mut h = sharing_harness().await;

    h.capture.end_screen();
    h.expect_event(|e| matches!(e, EngineEvent::ScreenShareChanged(false)))
        .await
        .expect("automatic revert");

    let camera = h.capture.latest(TrackSource::Camera).expect("camera");
    assert_eq!(last_video_replacement(&h), Some(camera.id().to_owned()));
    assert_eq!(
        h.factory.latest(&id("u2")).expect("transport").offers_created(),
        1
    );
}

#[tokio::test]
async fn test_camera_toggle_while_sharing_keeps_screen() {
    init_tracing();
    let mut h = sharing_harness().await;
    let screen = h.capture.latest(TrackSource::Screen).expect("screen");

    h.handle.set_capability(TrackKind::Video, false).await;
    h.expect_sent("toggle-video").await.expect("toggle off");
    h.handle.set_capability(TrackKind::Video, true).await;
    h.expect_sent("toggle-video").await.expect("toggle on");

    assert_eq!(last_video_replacement(&h), Some(screen.id().to_owned()));
    assert!(screen.is_enabled());
}
