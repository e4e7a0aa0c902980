mod local;

pub use local::LocalMedia;

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use liveroom_core::TrackKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
}

/// Handle to a locally captured track.
///
/// The enabled flag is shared by every clone, so flipping it mutes the track on
/// every link that carries it. Writers feeding samples are expected to drop
/// samples while the track is disabled.
#[derive(Debug, Clone)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    source: TrackSource,
    enabled: Arc<AtomicBool>,
    ended: watch::Receiver<bool>,
}

/// Held by the capture side; signals that the source stopped on its own
/// (e.g. the user ended a screen share from the OS picker).
#[derive(Debug)]
pub struct TrackEnd(watch::Sender<bool>);

impl TrackEnd {
    pub fn end(&self) {
        let _ = self.0.send(true);
    }
}

impl LocalTrack {
    pub fn new(kind: TrackKind, source: TrackSource) -> (Self, TrackEnd) {
        let (tx, rx) = watch::channel(false);
        let track = Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source,
            enabled: Arc::new(AtomicBool::new(true)),
            ended: rx,
        };
        (track, TrackEnd(tx))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Resolves to `true` once the source ends, or `false` if the capture side
    /// dropped its [`TrackEnd`] without ending the track.
    pub async fn ended(&self) -> bool {
        let mut rx = self.ended.clone();
        rx.wait_for(|ended| *ended).await.is_ok()
    }
}

/// Tracks returned by one capture request.
#[derive(Debug, Clone, Default)]
pub struct MediaBundle {
    pub tracks: Vec<LocalTrack>,
}

impl MediaBundle {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self { tracks }
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn take(&mut self, kind: TrackKind) -> Option<LocalTrack> {
        let idx = self.tracks.iter().position(|t| t.kind() == kind)?;
        Some(self.tracks.remove(idx))
    }
}

/// Remote media reported by a peer link, handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

/// Media-capture collaborator.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Acquire camera and/or microphone tracks. Fails with [`EngineError::Device`].
    async fn acquire(&self, video: bool, audio: bool) -> Result<MediaBundle>;

    /// Acquire a screen-capture bundle for screen sharing.
    async fn acquire_display(&self) -> Result<MediaBundle>;
}

/// Capture for headless participants: no devices at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

#[async_trait]
impl MediaCapture for NoCapture {
    async fn acquire(&self, _video: bool, _audio: bool) -> Result<MediaBundle> {
        Err(EngineError::Device("no capture devices available".into()))
    }

    async fn acquire_display(&self) -> Result<MediaBundle> {
        Err(EngineError::Device("no display capture available".into()))
    }
}
