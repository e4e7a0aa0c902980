use async_trait::async_trait;
use liveroom_core::TrackKind;
use liveroom_engine::error::{EngineError, Result};
use liveroom_engine::media::{LocalTrack, MediaBundle, MediaCapture, TrackEnd, TrackSource};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Media capture that fabricates tracks and keeps their end handles so tests
/// can stop a source on demand.
#[derive(Default)]
pub struct MockCapture {
    devices_unavailable: AtomicBool,
    acquisitions: AtomicUsize,
    ends: Mutex<Vec<(LocalTrack, TrackEnd)>>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture that fails every camera/microphone request.
    pub fn without_devices() -> Self {
        let capture = Self::default();
        capture.devices_unavailable.store(true, Ordering::SeqCst);
        capture
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    fn make(&self, kind: TrackKind, source: TrackSource) -> LocalTrack {
        let (track, end) = LocalTrack::new(kind, source);
        self.ends.lock().unwrap().push((track.clone(), end));
        track
    }

    /// Every track handed out so far, oldest first.
    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.ends
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn latest(&self, source: TrackSource) -> Option<LocalTrack> {
        self.tracks().into_iter().rev().find(|t| t.source() == source)
    }

    /// Stops the most recently captured screen source.
    pub fn end_screen(&self) {
        let ends = self.ends.lock().unwrap();
        if let Some((_, end)) = ends
            .iter()
            .rev()
            .find(|(t, _)| t.source() == TrackSource::Screen)
        {
            end.end();
        }
    }
}

#[async_trait]
impl MediaCapture for MockCapture {
    async fn acquire(&self, video: bool, audio: bool) -> Result<MediaBundle> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.devices_unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::Device("permission denied".into()));
        }

        let mut tracks = Vec::new();
        if video {
            tracks.push(self.make(TrackKind::Video, TrackSource::Camera));
        }
        if audio {
            tracks.push(self.make(TrackKind::Audio, TrackSource::Microphone));
        }
        Ok(MediaBundle::new(tracks))
    }

    async fn acquire_display(&self) -> Result<MediaBundle> {
        Ok(MediaBundle::new(vec![
            self.make(TrackKind::Video, TrackSource::Screen),
        ]))
    }
}
