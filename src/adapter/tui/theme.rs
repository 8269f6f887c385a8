use ratatui::style::{Color, Modifier, Style};

use crate::application::panel::StatusKind;

/// Theme tokens for consistent styling across the panel
pub struct Theme {
    pub title: Style,
    pub border: Style,
    pub focused_border: Style,
    pub selected: Style,
    pub normal: Style,
    pub muted: Style,
    pub danger: Style,
    pub warning: Style,
    pub success: Style,
    pub key_hint: Style,
    pub avatar: Style,
}

impl Theme {
    pub fn status(&self, kind: StatusKind) -> Style {
        match kind {
            StatusKind::Info => self.success,
            StatusKind::Warning => self.warning,
            StatusKind::Error => self.danger,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            focused_border: Style::default().fg(Color::Cyan),
            selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            normal: Style::default().fg(Color::White),
            muted: Style::default().fg(Color::DarkGray),
            danger: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            warning: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            success: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            key_hint: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            avatar: Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }
}
