use std::sync::Arc;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::RodioEngine;
use crate::catalog::{Catalog, HttpCatalog};
use crate::mpris::ControlCmd;
use crate::player::Player;

mod event_loop;
mod logging;
mod settings;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_problem) = settings::load_settings();
    logging::init(&settings.log);
    if let Some(problem) = settings_problem {
        log::warn!("{problem}");
    }
    log::info!("cadenza starting, catalog at {}", settings.catalog.base_url);

    let catalog = Arc::new(HttpCatalog::new(&settings.catalog)?);
    let engine = RodioEngine::new(catalog.http_client())?;
    let endpoint = catalog.endpoint().clone();

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    let shared: Arc<dyn Catalog> = catalog;
    let mut player = Player::new(
        engine,
        Arc::clone(&shared),
        endpoint,
        Box::new(mpris),
        &settings.playback,
    );

    let mut app = App::new(shared);
    app.attach_player(player.subscribe());
    app.refresh();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mut player,
        &control_tx,
        &control_rx,
        &mut event_loop::EventLoopState::default(),
    );

    player.stop();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    log::info!("cadenza exiting");
    run_result
}
