use crate::media::{LocalTrack, MediaBundle, TrackSource};
use liveroom_core::TrackKind;

/// Local capture state owned by the coordinator.
#[derive(Debug, Default)]
pub struct LocalMedia {
    camera: Option<LocalTrack>,
    microphone: Option<LocalTrack>,
    screen: Option<LocalTrack>,
    video_enabled: bool,
    audio_enabled: bool,
}

impl LocalMedia {
    pub fn new(video_enabled: bool, audio_enabled: bool) -> Self {
        Self {
            video_enabled,
            audio_enabled,
            ..Default::default()
        }
    }

    /// Stores camera/microphone tracks from a capture bundle.
    pub fn install(&mut self, mut bundle: MediaBundle) {
        if let Some(track) = bundle.take(TrackKind::Video) {
            self.set_track(track);
        }
        if let Some(track) = bundle.take(TrackKind::Audio) {
            self.set_track(track);
        }
    }

    pub fn set_track(&mut self, track: LocalTrack) {
        match track.kind() {
            TrackKind::Video => self.camera = Some(track),
            TrackKind::Audio => self.microphone = Some(track),
        }
    }

    /// Camera or microphone track of the given kind.
    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        match kind {
            TrackKind::Video => self.camera.as_ref(),
            TrackKind::Audio => self.microphone.as_ref(),
        }
    }

    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.video_enabled,
            TrackKind::Audio => self.audio_enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) {
        match kind {
            TrackKind::Video => self.video_enabled = enabled,
            TrackKind::Audio => self.audio_enabled = enabled,
        }
    }

    pub fn screen(&self) -> Option<&LocalTrack> {
        self.screen.as_ref()
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    pub fn set_screen(&mut self, track: LocalTrack) {
        debug_assert_eq!(track.source(), TrackSource::Screen);
        self.screen = Some(track);
    }

    pub fn take_screen(&mut self) -> Option<LocalTrack> {
        self.screen.take()
    }

    /// Outgoing video: the screen while sharing, the camera otherwise.
    pub fn outgoing_video(&self) -> Option<&LocalTrack> {
        self.screen.as_ref().or(self.camera.as_ref())
    }

    /// Tracks a freshly created link should send.
    pub fn outgoing(&self) -> Vec<LocalTrack> {
        self.outgoing_video()
            .into_iter()
            .chain(self.microphone.as_ref())
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.camera = None;
        self.microphone = None;
        self.screen = None;
    }
}
