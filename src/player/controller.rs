use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{AudioEngine, LoadEvent};
use crate::catalog::{Catalog, CatalogError, Endpoint, Track};
use crate::config::PlaybackSettings;
use crate::inflight::Inflight;

use super::session::Session;
use super::snapshot::{NowPlaying, NowPlayingSink, PlaybackState, PlayerSnapshot};
use super::tick::Ticker;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("track {id:?} is not in the supplied playlist")]
    TrackNotInPlaylist { id: String },
}

/// Owns the single playback session.
///
/// All methods run on the main loop. Operations that need a loaded track are
/// silent no-ops when nothing is loaded.
pub struct Player<E: AudioEngine> {
    engine: E,
    endpoint: Endpoint,
    catalog: Arc<dyn Catalog>,
    now_playing: Box<dyn NowPlayingSink>,
    session: Session,
    repeat_enabled: bool,
    ticker: Ticker,
    end_margin: Duration,
    lyrics: Inflight<Result<String, CatalogError>>,
    lyrics_wanted: bool,
    subscribers: Vec<Sender<PlayerSnapshot>>,
}

impl<E: AudioEngine> Player<E> {
    pub fn new(
        engine: E,
        catalog: Arc<dyn Catalog>,
        endpoint: Endpoint,
        now_playing: Box<dyn NowPlayingSink>,
        settings: &PlaybackSettings,
    ) -> Self {
        Self {
            engine,
            endpoint,
            catalog,
            now_playing,
            session: Session::default(),
            repeat_enabled: settings.repeat,
            ticker: Ticker::new(Duration::from_millis(settings.tick_ms.max(1))),
            end_margin: Duration::from_millis(settings.end_margin_ms),
            lyrics: Inflight::new(),
            lyrics_wanted: false,
            subscribers: Vec::new(),
        }
    }

    /// Register an observer. The current state is sent right away.
    pub fn subscribe(&mut self) -> Receiver<PlayerSnapshot> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            track: self.session.track.clone(),
            state: self.state(),
            current_time: self.session.current_time,
            duration: self.session.duration_known.then_some(self.session.duration),
            repeat_enabled: self.repeat_enabled,
            index: self.session.is_active().then_some(self.session.index),
            playlist_len: self.session.playlist.len(),
            lyrics: self.session.lyrics.clone(),
            lyrics_pending: self.lyrics.is_pending(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        if !self.session.is_active() {
            PlaybackState::Stopped
        } else if self.session.playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.playing
    }

    pub fn current_time(&self) -> Duration {
        self.session.current_time
    }

    pub fn duration(&self) -> Duration {
        self.session.duration
    }

    pub fn repeat_enabled(&self) -> bool {
        self.repeat_enabled
    }

    pub fn current_index(&self) -> usize {
        self.session.index
    }

    pub fn playlist(&self) -> &[Track] {
        &self.session.playlist
    }

    pub fn lyrics_text(&self) -> Option<&str> {
        self.session.lyrics.as_deref()
    }

    /// Play `track` out of `playlist`. Replaying the current track resumes it,
    /// unless its audio failed to load, in which case it is loaded again.
    pub fn play(&mut self, track: &Track, playlist: &[Track]) -> Result<(), PlayerError> {
        if self.session.is_current(track) && self.session.playable {
            self.resume();
            return Ok(());
        }

        let index = playlist
            .iter()
            .position(|t| t.id() == track.id())
            .ok_or_else(|| PlayerError::TrackNotInPlaylist {
                id: track.id().to_string(),
            })?;

        self.start(playlist.to_vec(), index);
        Ok(())
    }

    pub fn resume(&mut self) {
        if !self.session.is_active() || !self.session.playable {
            return;
        }
        self.engine.play();
        self.session.playing = true;
        if !self.ticker.is_running() {
            self.ticker.start(Instant::now());
        }
        self.changed();
    }

    pub fn pause(&mut self) {
        if !self.session.is_active() {
            return;
        }
        self.engine.pause();
        self.session.playing = false;
        self.changed();
    }

    pub fn toggle_play_pause(&mut self) {
        if self.session.playing {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Move to `to`. Callers clamp to the track length.
    pub fn seek(&mut self, to: Duration) {
        if !self.session.is_active() {
            return;
        }
        self.engine.seek(to);
        self.session.current_time = to;
        self.changed();
    }

    /// Relative seek by a signed microsecond offset, clamped to
    /// `[0, duration]` when the duration is known.
    pub fn seek_by(&mut self, offset_micros: i64) {
        let delta = Duration::from_micros(offset_micros.unsigned_abs());
        let mut to = if offset_micros >= 0 {
            self.session.current_time.saturating_add(delta)
        } else {
            self.session.current_time.saturating_sub(delta)
        };
        if self.session.duration_known {
            to = to.min(self.session.duration);
        }
        self.seek(to);
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat_enabled = !self.repeat_enabled;
        self.changed();
    }

    /// Advance after a track ends. With repeat on, reloads the current track.
    pub fn next_song(&mut self) {
        if self.session.playlist.is_empty() {
            return;
        }
        if self.repeat_enabled {
            let playlist = std::mem::take(&mut self.session.playlist);
            let index = self.session.index % playlist.len();
            self.start(playlist, index);
        } else {
            self.step(1);
        }
    }

    /// User skip: always moves on, even in repeat mode.
    pub fn force_next_song(&mut self) {
        self.step(1);
    }

    pub fn previous_song(&mut self) {
        self.step(-1);
    }

    pub fn stop(&mut self) {
        if !self.session.is_active() {
            return;
        }
        self.teardown();
        self.changed();
    }

    /// Request lyrics for `track_id` in the background; `poll` stores them.
    pub fn fetch_lyrics(&mut self, track_id: &str) {
        self.spawn_lyrics(track_id.to_string());
        self.changed();
    }

    /// While wanted, every track that gets loaded has its lyrics fetched,
    /// including reloads of the same track.
    pub fn set_lyrics_wanted(&mut self, wanted: bool) {
        self.lyrics_wanted = wanted;
        if wanted && self.request_lyrics() {
            self.changed();
        }
    }

    /// Fetch lyrics for the loaded track unless they are present or on the way.
    fn request_lyrics(&mut self) -> bool {
        if self.session.lyrics.is_some() || self.lyrics.is_pending() {
            return false;
        }
        match self.session.track.as_ref().map(|t| t.id().to_string()) {
            Some(id) => {
                self.spawn_lyrics(id);
                true
            }
            None => false,
        }
    }

    fn spawn_lyrics(&mut self, id: String) {
        let catalog = Arc::clone(&self.catalog);
        log::debug!("fetching lyrics for {id}");
        self.lyrics.spawn(move || catalog.lyrics(&id));
    }

    /// Main-loop hook: collect background completions and run the tick when due.
    pub fn poll(&mut self, now: Instant) {
        if let Some(event) = self.engine.poll() {
            self.on_load(event);
        }

        if let Some(result) = self.lyrics.poll() {
            match result {
                Ok(text) => self.session.lyrics = Some(text),
                Err(e) => log::warn!("lyrics fetch failed: {e}"),
            }
            self.changed();
        }

        if self.ticker.due(now) {
            self.tick();
        }
    }

    /// Sample the engine and handle end-of-track.
    pub fn tick(&mut self) {
        if !self.session.is_active() {
            return;
        }

        self.session.current_time = self.engine.position();
        if let Some(d) = self.engine.duration().filter(|d| !d.is_zero()) {
            self.session.duration = d;
            self.session.duration_known = true;
        }
        self.changed();

        if self.session.playing && self.track_finished() {
            self.on_track_finished();
        }
    }

    fn track_finished(&self) -> bool {
        if self.engine.finished() {
            return true;
        }
        // Fires slightly early on purpose; never before the length is known.
        self.session.duration_known
            && self.session.current_time + self.end_margin >= self.session.duration
    }

    fn on_track_finished(&mut self) {
        // A drained engine has nothing left to seek in; reload instead.
        if self.repeat_enabled && !self.engine.finished() {
            log::debug!("repeating current track");
            self.engine.seek(Duration::ZERO);
            self.engine.play();
            self.session.current_time = Duration::ZERO;
            self.session.playing = true;
            self.changed();
        } else {
            self.next_song();
        }
    }

    fn on_load(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Ready => {
                if let Some(d) = self.engine.duration().filter(|d| !d.is_zero()) {
                    self.session.duration = d;
                    self.session.duration_known = true;
                }
                log::debug!("audio ready, duration {:?}", self.engine.duration());
            }
            LoadEvent::Failed(e) => {
                log::warn!("audio load failed: {e}");
                self.engine.release();
                self.ticker.stop();
                self.session.playing = false;
                self.session.playable = false;
            }
        }
        self.changed();
    }

    fn step(&mut self, step: isize) {
        let Some(index) = self.session.wrapped_index(step) else {
            return;
        };
        let playlist = std::mem::take(&mut self.session.playlist);
        self.start(playlist, index);
    }

    fn start(&mut self, playlist: Vec<Track>, index: usize) {
        self.teardown();

        let track = playlist[index].clone();
        let url = track.audio_url(&self.endpoint);
        if let Err(e) = self.engine.load(&url) {
            log::warn!("not playing {:?}: {e}", track.id());
            self.changed();
            return;
        }
        log::info!("playing {} [{}/{}]", track.display(), index + 1, playlist.len());

        self.session.track = Some(track);
        self.session.playlist = playlist;
        self.session.index = index;
        self.session.playable = true;

        self.engine.play();
        self.session.playing = true;
        self.ticker.start(Instant::now());
        if self.lyrics_wanted {
            self.request_lyrics();
        }
        self.changed();
    }

    fn teardown(&mut self) {
        self.engine.pause();
        self.ticker.stop();
        self.engine.release();
        self.lyrics.cancel();
        self.session.reset();
    }

    fn changed(&mut self) {
        let now_playing = NowPlaying::derive(
            self.session.track.as_ref(),
            self.session.current_time,
            self.session.duration,
            &self.endpoint,
        );
        self.now_playing.update(now_playing.as_ref(), self.state());

        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
