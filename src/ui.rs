//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, LyricsView};
use crate::config::{Settings, TimeField, UiSettings};
use crate::player::PlaybackState;

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("zz".to_string(), "jump to playing".to_string());
    map.insert("enter".to_string(), "play selected song".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/skip song".to_string());
    // H/L is filled dynamically from config.
    map.insert("/".to_string(), "search".to_string());
    map.insert("r".to_string(), "repeat one".to_string());
    map.insert("K".to_string(), "lyrics".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "zz", "K", "/", "r", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Status line fragments for the status box.
fn status_parts(app: &App, ui: &UiSettings) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();

    let snapshot = &app.player;
    match &snapshot.track {
        Some(track) => {
            let song = track.display();
            match now_playing_time_text(snapshot.current_time, snapshot.duration, ui) {
                Some(time) => parts.push(format!("Song: {} [{}]", song, time)),
                None => parts.push(format!("Song: {}", song)),
            }
            let state = match snapshot.state {
                PlaybackState::Playing => "Playing",
                PlaybackState::Paused => "Paused",
                PlaybackState::Stopped => "Stopped",
            };
            parts.push(state.to_string());
            if let Some(i) = snapshot.index {
                parts.push(format!("{}/{}", i + 1, snapshot.playlist_len));
            }
        }
        None => parts.push("Stopped".to_string()),
    }

    if snapshot.repeat_enabled {
        parts.push("REPEAT: One".to_string());
    } else {
        parts.push("REPEAT: Off".to_string());
    }

    let q = app.search_query.trim();
    if app.search_mode || !q.is_empty() {
        let mut search_part = String::from("SEARCH:");
        if !q.is_empty() {
            search_part.push(' ');
            search_part.push_str(q);
        }
        parts.push(search_part);
    }

    if app.loading {
        parts.push("Loading…".to_string());
    }

    if let Some(err) = &app.error {
        parts.push(format!("ERROR: {}", err));
    }

    parts
}

/// Text for the lyrics popup.
fn lyrics_text(view: LyricsView<'_>) -> String {
    match view {
        LyricsView::NoTrack => "Nothing is playing.".to_string(),
        LyricsView::Loading => "Loading lyrics…".to_string(),
        LyricsView::Missing => "No lyrics for this song.".to_string(),
        LyricsView::Text(text) => text.to_string(),
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, settings: &Settings) {
    let ui_settings = &settings.ui;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());
    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" cadenza ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = status_parts(app, ui_settings).join(" • ");
    let status_par = Paragraph::new(status)
        .slow_blink()
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Main list
    {
        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let total = app.tracks.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = (start..end)
            .map(|i| {
                let marker = if app.is_now_playing(i) { "♪ " } else { "  " };
                ListItem::new(format!("{}{}", marker, app.tracks[i].display()))
            })
            .collect();

        let title = if app.loading && total == 0 {
            " songs (loading…) ".to_string()
        } else {
            format!(" songs ({}) ", total)
        };
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    // Overlay lyrics popup (keeps list visible under it)
    if app.lyrics_window {
        let list_area = chunks[2];
        let popup_area = centered_rect_sized(72, 20, list_area);
        frame.render_widget(Clear, popup_area);

        let title = match &app.player.track {
            Some(track) => format!(" lyrics: {} (K closes) ", track.name()),
            None => " lyrics (K closes) ".to_string(),
        };
        let text = lyrics_text(app.lyrics_view(&settings.catalog.no_lyrics_placeholder));
        let lyrics_paragraph = Paragraph::new(text)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(title),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(lyrics_paragraph, popup_area);
    }

    let footer_text = controls_text(settings.controls.scrub_seconds);
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[3]);
}
