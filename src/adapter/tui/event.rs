use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use super::app::{App, Focus};

/// Poll for keyboard events with timeout
pub fn poll_event(timeout_ms: u64) -> anyhow::Result<Option<Event>> {
    if event::poll(Duration::from_millis(timeout_ms))? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

pub fn handle_event(app: &mut App, event: Event) {
    let Event::Key(key) = event else {
        // Resize is handled by ratatui on the next draw
        return;
    };
    // Only handle key press events (not release)
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.panel.form.is_some() {
        handle_create_form(app, key);
    } else {
        handle_group_list(app, key.code);
    }
}

fn handle_group_list(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.group_up(),
        KeyCode::Down | KeyCode::Char('j') => app.group_down(),
        KeyCode::Char('n') => app.open_create(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_create_form(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            app.submit();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.close_create();
            return;
        }
        KeyCode::Tab => {
            app.view.focus = app.view.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.view.focus = app.view.focus.prev();
            return;
        }
        _ => {}
    }

    match app.view.focus {
        Focus::Name => match key.code {
            KeyCode::Char(c) => app.edit_name(|name| name.push(c)),
            KeyCode::Backspace => app.edit_name(|name| {
                name.pop();
            }),
            KeyCode::Enter => app.submit(),
            _ => {}
        },
        Focus::Search => match key.code {
            KeyCode::Char(c) => app.edit_query(|query| query.push(c)),
            KeyCode::Backspace => app.edit_query(|query| {
                query.pop();
            }),
            KeyCode::Enter | KeyCode::Down => app.view.focus = Focus::Results,
            _ => {}
        },
        Focus::Results => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => app.cursor_down(),
            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_current_result(),
            _ => {}
        },
        Focus::Selected => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => app.cursor_down(),
            KeyCode::Char(' ') | KeyCode::Delete | KeyCode::Backspace => {
                app.remove_current_selected()
            }
            _ => {}
        },
    }
}
