//! Keyboard-driven group panel.

mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, AppMessage, Focus, ViewState};

use ratatui::DefaultTerminal;
use std::sync::Arc;

use crate::adapter::state::AppState;
use crate::infrastructure::config::PanelConfig;

pub async fn run(state: Arc<AppState>, config: &PanelConfig) -> anyhow::Result<()> {
    let app = App::new(state, config.limits(), config.search_debounce());

    // Initialize terminal (ratatui::init handles raw mode + alternate screen)
    let terminal = ratatui::init();

    let result = run_app(terminal, app).await;

    // Restore terminal (always, even on error)
    ratatui::restore();

    result
}

async fn run_app(mut terminal: DefaultTerminal, mut app: App) -> anyhow::Result<()> {
    app.refresh();

    loop {
        app.tick();

        terminal.draw(|frame| ui::render(frame, &app.panel, &app.view))?;

        if app.should_quit {
            break;
        }

        // Short poll so debounced searches and finished requests show up promptly
        if let Some(evt) = event::poll_event(50)? {
            event::handle_event(&mut app, evt);
        }
    }

    tracing::info!("Panel closed");
    Ok(())
}
