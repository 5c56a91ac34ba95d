use std::time::Duration;

use crate::catalog::Track;

/// In-memory state of the loaded track. Reset wholesale on teardown.
#[derive(Debug, Default)]
pub(super) struct Session {
    pub track: Option<Track>,
    pub playing: bool,
    /// False once the engine reported that the resource cannot be played.
    pub playable: bool,
    pub current_time: Duration,
    pub duration: Duration,
    pub duration_known: bool,
    pub playlist: Vec<Track>,
    pub index: usize,
    pub lyrics: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }

    pub fn is_current(&self, track: &Track) -> bool {
        self.track.as_ref().is_some_and(|t| t.id() == track.id())
    }

    /// Index `step` positions away from the current one, wrapping both ways.
    pub fn wrapped_index(&self, step: isize) -> Option<usize> {
        let len = self.playlist.len();
        if len == 0 {
            return None;
        }
        let len = len as isize;
        Some((self.index as isize + step).rem_euclid(len) as usize)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
