//! Application model types: `App` and `LyricsView`.
//!
//! The `App` struct holds the catalog listing, the selection, the search box
//! and the latest player snapshot used by the UI and runtime.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::catalog::{Catalog, CatalogError, Track, search_term};
use crate::inflight::Inflight;
use crate::player::PlayerSnapshot;

/// What the lyrics window should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsView<'a> {
    NoTrack,
    Loading,
    /// The server answered with its "no lyrics" placeholder.
    Missing,
    Text(&'a str),
}

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    pub selected: usize,

    pub search_mode: bool,
    pub search_query: String,

    pub loading: bool,
    pub error: Option<String>,

    pub player: PlayerSnapshot,
    pub lyrics_window: bool,

    catalog: Arc<dyn Catalog>,
    listing: Inflight<Result<Vec<Track>, CatalogError>>,
    player_rx: Option<Receiver<PlayerSnapshot>>,
}

impl App {
    /// Create a new `App` that lists songs from `catalog`.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            tracks: Vec::new(),
            selected: 0,
            search_mode: false,
            search_query: String::new(),
            loading: false,
            error: None,
            player: PlayerSnapshot::default(),
            lyrics_window: false,
            catalog,
            listing: Inflight::new(),
            player_rx: None,
        }
    }

    /// Follow player state through `rx`.
    pub fn attach_player(&mut self, rx: Receiver<PlayerSnapshot>) {
        self.player_rx = Some(rx);
    }

    /// Re-fetch the listing for the current search box contents.
    pub fn refresh(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        let search = search_term(&self.search_query).map(str::to_string);
        self.loading = true;
        self.listing
            .spawn(move || catalog.list(search.as_deref()));
    }

    /// Pull in finished catalog requests and the newest player snapshot.
    pub fn poll(&mut self) {
        if let Some(result) = self.listing.poll() {
            self.loading = false;
            match result {
                Ok(tracks) => {
                    self.tracks = tracks;
                    self.error = None;
                    self.clamp_selection();
                }
                Err(e) => {
                    log::warn!("catalog request failed: {e}");
                    self.error = Some(e.to_string());
                }
            }
        }

        if let Some(rx) = &self.player_rx {
            if let Some(snapshot) = rx.try_iter().last() {
                self.player = snapshot;
            }
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks.get(self.selected)
    }

    /// Whether row `index` is the track the player has loaded.
    pub fn is_now_playing(&self, index: usize) -> bool {
        match (&self.player.track, self.tracks.get(index)) {
            (Some(current), Some(row)) => current.id() == row.id(),
            _ => false,
        }
    }

    /// Move selection to the next track, wrapping to the first.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping to the last.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + self.tracks.len() - 1) % self.tracks.len();
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks.len().saturating_sub(1);
    }

    /// Put the cursor on the playing track, if it is listed.
    pub fn select_now_playing(&mut self) {
        if let Some(i) = (0..self.tracks.len()).find(|&i| self.is_now_playing(i)) {
            self.selected = i;
        }
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.tracks.len() {
            self.selected = 0;
        }
    }

    /// Enter search mode; keystrokes now edit the query.
    pub fn enter_search_mode(&mut self) {
        self.search_mode = true;
    }

    /// Leave search mode, keeping the current results.
    pub fn exit_search_mode(&mut self) {
        self.search_mode = false;
    }

    /// Append a character to the query and search again.
    pub fn push_search_char(&mut self, c: char) {
        self.search_query.push(c);
        self.refresh();
    }

    /// Remove the last character from the query and search again.
    pub fn pop_search_char(&mut self) {
        if self.search_query.pop().is_some() {
            self.refresh();
        }
    }

    /// Drop the query and show the full listing again.
    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.search_mode = false;
        self.selected = 0;
        self.refresh();
    }

    pub fn toggle_lyrics_window(&mut self) {
        self.lyrics_window = !self.lyrics_window;
    }

    /// Map the player's lyric state to what the lyrics window renders.
    pub fn lyrics_view<'a>(&'a self, no_lyrics_placeholder: &str) -> LyricsView<'a> {
        if self.player.track.is_none() {
            return LyricsView::NoTrack;
        }
        match self.player.lyrics.as_deref() {
            None => LyricsView::Loading,
            Some(text) if text.trim() == no_lyrics_placeholder.trim() => LyricsView::Missing,
            Some(text) if text.trim().is_empty() => LyricsView::Missing,
            Some(text) => LyricsView::Text(text),
        }
    }
}
