use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::AudioEngine;
use crate::config;
use crate::mpris::ControlCmd;
use crate::player::Player;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
}

/// Main terminal event loop: handles input, UI drawing, player completions
/// and MPRIS commands. Returns `Ok(())` when shutdown is requested.
pub fn run<E: AudioEngine>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &mut Player<E>,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        player.poll(Instant::now());
        app.poll();

        terminal.draw(|f| ui::draw(f, app, settings))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app, player) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, player, control_tx, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_control_cmd<E: AudioEngine>(
    cmd: ControlCmd,
    app: &App,
    player: &mut Player<E>,
) -> bool {
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if player.current_track().is_some() {
                player.resume();
            } else {
                play_selected(app, player);
            }
        }
        ControlCmd::Pause => player.pause(),
        ControlCmd::PlayPause => {
            if player.current_track().is_some() {
                player.toggle_play_pause();
            } else {
                play_selected(app, player);
            }
        }
        ControlCmd::Stop => player.stop(),
        ControlCmd::Next => player.force_next_song(),
        ControlCmd::Prev => player.previous_song(),
        ControlCmd::SeekBy(micros) => player.seek_by(micros),
        ControlCmd::SetPosition(micros) => {
            let to = Duration::from_micros(micros.max(0).unsigned_abs());
            let to = if player.duration().is_zero() {
                to
            } else {
                to.min(player.duration())
            };
            player.seek(to);
        }
    }
    false
}

fn play_selected<E: AudioEngine>(app: &App, player: &mut Player<E>) {
    if let Some(track) = app.selected_track() {
        if let Err(e) = player.play(track, &app.tracks) {
            log::warn!("{e}");
        }
    }
}

fn handle_key_event<E: AudioEngine>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    player: &mut Player<E>,
    control_tx: &mpsc::Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    if app.search_mode {
        state.pending_gg = false;
        state.pending_zz = false;
        match key.code {
            KeyCode::Esc => app.clear_search(),
            KeyCode::Backspace => app.pop_search_char(),
            KeyCode::Char('j') | KeyCode::Char('n')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.next()
            }
            KeyCode::Char('k') | KeyCode::Char('p')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.prev()
            }
            KeyCode::Char(c) => {
                if !c.is_control() {
                    app.push_search_char(c);
                }
            }
            KeyCode::Enter => {
                app.exit_search_mode();
                play_selected(app, player);
            }
            _ => {}
        }
        return false;
    }

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }
    if key.code != KeyCode::Char('z') {
        state.pending_zz = false;
    }

    let scrub = i64::try_from(settings.controls.scrub_seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1_000_000);
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('/') => app.enter_search_mode(),
        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                app.clear_search();
            }
        }
        KeyCode::Char('r') => player.toggle_repeat(),
        KeyCode::Char('z') => {
            if state.pending_zz {
                state.pending_zz = false;
                app.select_now_playing();
            } else {
                state.pending_zz = true;
            }
        }
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => play_selected(app, player),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => player.seek_by(scrub),
        KeyCode::Char('H') => player.seek_by(-scrub),
        KeyCode::Char('K') => {
            app.toggle_lyrics_window();
            player.set_lyrics_wanted(app.lyrics_window);
        }
        _ => {}
    }

    false
}
