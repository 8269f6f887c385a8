use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::app::{Focus, ViewState};
use super::theme::Theme;
use crate::application::panel::{CreateGroupForm, GroupPanel};
use crate::domain::model::{Group, Player};

pub fn render(frame: &mut Frame, panel: &GroupPanel, view: &ViewState) {
    let theme = Theme::default();

    let [header, body, status, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(5),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header, panel, &theme);

    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(body);
    render_group_list(frame, list_area, panel, view, &theme);
    render_group_detail(frame, detail_area, panel.groups.get(view.group_index), &theme);

    render_status(frame, status, panel, &theme);
    render_footer(frame, footer, panel.form.is_some(), &theme);

    if let Some(form) = &panel.form {
        render_create_form(frame, form, view, &theme);
    }
}

fn render_header(frame: &mut Frame, area: Rect, panel: &GroupPanel, theme: &Theme) {
    let who = match &panel.session {
        Some(session) => Span::styled(format!("signed in as {}", session.display_name()), theme.muted),
        None => Span::styled("not signed in", theme.warning),
    };
    let line = Line::from(vec![Span::styled(" Rosterly ", theme.title), Span::raw(" "), who]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_group_list(
    frame: &mut Frame,
    area: Rect,
    panel: &GroupPanel,
    view: &ViewState,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(format!(" Groups ({}) ", panel.groups.len()))
        .title_style(theme.title);

    if panel.groups.is_empty() {
        let msg = if panel.loading {
            "Loading..."
        } else if panel.session.is_none() {
            "(Sign in to see your groups)"
        } else {
            "(No groups yet, press n to create one)"
        };
        let p = Paragraph::new(msg)
            .style(theme.muted)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(p, area);
        return;
    }

    let user_id = panel.user_id().unwrap_or_default();
    let items: Vec<ListItem> = panel
        .groups
        .iter()
        .map(|group| {
            let mut spans = vec![
                Span::raw(group.name.clone()),
                Span::styled(format!("  {} player(s)", group.players.len()), theme.muted),
            ];
            if group.is_owned_by(user_id) {
                spans.push(Span::styled("  owner", theme.success));
            }
            ListItem::new(Line::from(spans)).style(theme.normal)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme.selected)
        .highlight_symbol("▸ ");
    let mut state = ListState::default().with_selected(Some(view.group_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_group_detail(frame: &mut Frame, area: Rect, group: Option<&Group>, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(" Members ")
        .title_style(theme.title);

    let Some(group) = group else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(group.name.clone(), theme.title)),
        Line::from(Span::styled(
            format!("created {}", group.created_at.date()),
            theme.muted,
        )),
        Line::default(),
    ];
    if group.players.is_empty() {
        lines.push(Line::from(Span::styled("(No players)", theme.muted)));
    }
    lines.extend(group.players.iter().map(|p| player_line(p, theme)));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Initials badge, name and avatar URL when there is one
fn player_line<'a>(player: &'a Player, theme: &Theme) -> Line<'a> {
    let mut spans = vec![
        Span::styled(format!(" {:<2} ", player.initials()), theme.avatar),
        Span::raw(" "),
        Span::styled(player.name.as_str(), theme.normal),
    ];
    if let Some(url) = &player.avatar_url {
        spans.push(Span::styled(format!("  {}", url), theme.muted));
    }
    Line::from(spans)
}

fn render_status(frame: &mut Frame, area: Rect, panel: &GroupPanel, theme: &Theme) {
    let line = match &panel.status {
        Some(status) => Line::from(Span::styled(status.text.as_str(), theme.status(status.kind))),
        None if panel.loading => Line::from(Span::styled("Loading groups...", theme.muted)),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, area: Rect, form_open: bool, theme: &Theme) {
    let hints: &[(&str, &str)] = if form_open {
        &[
            ("Tab", "Next field"),
            ("Space", "Toggle"),
            ("Del", "Remove"),
            ("Ctrl+S", "Create"),
            ("Esc", "Cancel"),
        ]
    } else {
        &[
            ("↑/↓", "Navigate"),
            ("n", "New group"),
            ("r", "Refresh"),
            ("q", "Quit"),
        ]
    };

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), theme.key_hint));
        spans.push(Span::styled(*label, theme.muted));
        spans.push(Span::raw("  "));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn render_create_form(frame: &mut Frame, form: &CreateGroupForm, view: &ViewState, theme: &Theme) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let title = if form.submitting {
        " New group (creating...) "
    } else {
        " New group "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.focused_border)
        .title(title)
        .title_style(theme.title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [name_area, search_area, lists_area, error_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(4),
        Constraint::Length(1),
    ])
    .areas(inner);

    render_input(frame, name_area, " Name ", &form.name, view.focus == Focus::Name, theme);

    let search_title = if form.searching {
        " Search players (searching...) "
    } else {
        " Search players "
    };
    render_input(
        frame,
        search_area,
        search_title,
        &form.query,
        view.focus == Focus::Search,
        theme,
    );

    let [results_area, selected_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(lists_area);

    let results: Vec<ListItem> = form
        .results
        .iter()
        .map(|p| {
            let mark = if form.is_selected(&p.id) { "[x] " } else { "[ ] " };
            ListItem::new(Line::from(vec![Span::raw(mark), Span::raw(p.name.as_str())]))
        })
        .collect();
    let empty_hint = if form.query.trim().is_empty() {
        "(Type to search)"
    } else if form.searching {
        "Searching..."
    } else {
        "(No matches)"
    };
    render_picker(
        frame,
        results_area,
        format!(" Results ({}) ", form.results.len()),
        results,
        empty_hint,
        view.result_index,
        view.focus == Focus::Results,
        theme,
    );

    let selected: Vec<ListItem> = form
        .selected
        .iter()
        .map(|p| ListItem::new(player_line(p, theme)))
        .collect();
    render_picker(
        frame,
        selected_area,
        format!(" Selected ({}) ", form.selected.len()),
        selected,
        "(Nobody selected)",
        view.selected_index,
        view.focus == Focus::Selected,
        theme,
    );

    if let Some(error) = &form.error {
        frame.render_widget(
            Paragraph::new(Span::styled(error.as_str(), theme.danger)),
            error_area,
        );
    }
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    focused: bool,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused, theme))
        .title(title.to_string());
    let cursor = if focused { "_" } else { "" };
    frame.render_widget(
        Paragraph::new(format!("{}{}", value, cursor)).block(block),
        area,
    );
}

#[allow(clippy::too_many_arguments)]
fn render_picker(
    frame: &mut Frame,
    area: Rect,
    title: String,
    items: Vec<ListItem>,
    empty_hint: &str,
    index: usize,
    focused: bool,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused, theme))
        .title(title);

    if items.is_empty() {
        frame.render_widget(
            Paragraph::new(empty_hint.to_string())
                .style(theme.muted)
                .block(block),
            area,
        );
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(if focused { theme.selected } else { Style::default() });
    let mut state = ListState::default().with_selected(Some(index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn border_style(focused: bool, theme: &Theme) -> Style {
    if focused {
        theme.focused_border
    } else {
        theme.border
    }
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::panel::PanelLimits;
    use crate::domain::model::{GroupRecord, Session};
    use ratatui::{backend::TestBackend, Terminal};
    use time::macros::datetime;

    fn screen(panel: &GroupPanel, view: &ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, panel, view)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn panel() -> GroupPanel {
        let mut panel = GroupPanel::new(PanelLimits {
            name_max_chars: 64,
            min_search_chars: 1,
        });
        panel.set_session(Ok(Some(Session::new("me"))));

        let mut ada = Player::new("p1", "u1", "Ada Lovelace");
        ada.avatar_url = Some("https://cdn.example.com/ada.png".into());
        panel.set_groups(Ok(vec![Group::from_record(
            GroupRecord {
                id: "g1".into(),
                name: "Friday Raid".into(),
                owner_id: Some("me".into()),
                created_at: datetime!(2024-06-01 12:00 UTC),
            },
            vec![ada, Player::new("p2", "u2", "Grace Hopper")],
        )]));
        panel
    }

    #[test]
    fn test_renders_groups_and_members() {
        let text = screen(&panel(), &ViewState::default());
        assert!(text.contains("Groups (1)"));
        assert!(text.contains("Friday Raid"));
        assert!(text.contains("2 player(s)"));
        assert!(text.contains(" AL  Ada Lovelace"));
        assert!(text.contains("https://cdn.example.com/ada.png"));
        assert!(text.contains("GH"));
        assert!(text.contains("signed in as me"));
    }

    #[test]
    fn test_renders_create_modal_with_error() {
        let mut panel = panel();
        panel.open_create();
        panel.set_name("friday raid");
        assert!(panel.begin_submit().is_err());

        let text = screen(&panel, &ViewState::default());
        assert!(text.contains("New group"));
        assert!(text.contains("friday raid_"));
        assert!(text.contains("(Type to search)"));
        assert!(text.contains("You already belong to a group named \"Friday Raid\"."));
    }

    #[test]
    fn test_signed_out_hint() {
        let mut panel = GroupPanel::new(PanelLimits {
            name_max_chars: 64,
            min_search_chars: 1,
        });
        panel.set_session(Ok(None));
        let text = screen(&panel, &ViewState::default());
        assert!(text.contains("not signed in"));
        assert!(text.contains("You must be signed in to manage groups."));
    }
}
