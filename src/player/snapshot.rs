use std::time::Duration;

use crate::catalog::{Endpoint, Track};

/// Transport state as seen by views and the OS.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Everything an observer needs to render the player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub track: Option<Track>,
    pub state: PlaybackState,
    pub current_time: Duration,
    /// `None` until the engine reports a length.
    pub duration: Option<Duration>,
    pub repeat_enabled: bool,
    pub index: Option<usize>,
    pub playlist_len: usize,
    pub lyrics: Option<String>,
    pub lyrics_pending: bool,
}

/// Metadata pushed to the OS now-playing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub duration: Option<Duration>,
    pub elapsed: Duration,
    pub artwork_url: Option<String>,
    pub audio_url: String,
}

impl NowPlaying {
    /// Pure function of the loaded track and its position.
    pub fn derive(
        track: Option<&Track>,
        current_time: Duration,
        duration: Duration,
        endpoint: &Endpoint,
    ) -> Option<Self> {
        let track = track?;
        Some(Self {
            track_id: track.id().to_string(),
            title: track.name().to_string(),
            artist: track.artist().to_string(),
            duration: (!duration.is_zero()).then_some(duration),
            elapsed: current_time,
            artwork_url: Some(track.cover_url(endpoint)),
            audio_url: track.audio_url(endpoint),
        })
    }
}

/// OS-level now-playing surface (MPRIS on Linux).
pub trait NowPlayingSink {
    fn update(&self, now_playing: Option<&NowPlaying>, state: PlaybackState);
}
