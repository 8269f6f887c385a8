use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use crate::adapter::error::ApiError;
use crate::adapter::state::AppState;
use crate::application::panel::{CreateRequest, GroupPanel, PanelLimits, SearchRequest};
use crate::application::service::CreateGroupOutcome;
use crate::domain::event::DomainEvent;
use crate::domain::model::{Group, Player, Session};

/// Which part of the create-group modal receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Name,
    Search,
    Results,
    Selected,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Name => Focus::Search,
            Focus::Search => Focus::Results,
            Focus::Results => Focus::Selected,
            Focus::Selected => Focus::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Name => Focus::Selected,
            Focus::Search => Focus::Name,
            Focus::Results => Focus::Search,
            Focus::Selected => Focus::Results,
        }
    }
}

/// Cursor positions; everything else lives in `GroupPanel`
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub group_index: usize,
    pub focus: Focus,
    pub result_index: usize,
    pub selected_index: usize,
}

/// Results of background requests, delivered back to the UI loop
#[derive(Debug)]
pub enum AppMessage {
    SessionLoaded(Result<Option<Session>, String>),
    GroupsLoaded(Result<Vec<Group>, String>),
    SearchDone {
        seq: u64,
        result: Result<Vec<Player>, String>,
    },
    CreateDone {
        form_id: u64,
        result: Result<CreateGroupOutcome, String>,
    },
}

pub struct App {
    pub panel: GroupPanel,
    pub view: ViewState,
    pub should_quit: bool,
    state: Arc<AppState>,
    tx: mpsc::UnboundedSender<AppMessage>,
    rx: mpsc::UnboundedReceiver<AppMessage>,
    events: broadcast::Receiver<DomainEvent>,
    pending_search: Option<(Instant, SearchRequest)>,
    debounce: Duration,
}

impl App {
    pub fn new(state: Arc<AppState>, limits: PanelLimits, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = state.event_bus.subscribe();
        Self {
            panel: GroupPanel::new(limits),
            view: ViewState::default(),
            should_quit: false,
            state,
            tx,
            rx,
            events,
            pending_search: None,
            debounce,
        }
    }

    pub fn selected_group(&self) -> Option<&Group> {
        self.panel.groups.get(self.view.group_index)
    }

    // Navigation helpers
    pub fn group_up(&mut self) {
        self.view.group_index = self.view.group_index.saturating_sub(1);
    }

    pub fn group_down(&mut self) {
        if self.view.group_index < self.panel.groups.len().saturating_sub(1) {
            self.view.group_index += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        match self.view.focus {
            Focus::Results => self.view.result_index = self.view.result_index.saturating_sub(1),
            Focus::Selected => {
                self.view.selected_index = self.view.selected_index.saturating_sub(1)
            }
            _ => {}
        }
    }

    pub fn cursor_down(&mut self) {
        let Some(form) = self.panel.form.as_ref() else {
            return;
        };
        match self.view.focus {
            Focus::Results if self.view.result_index + 1 < form.results.len() => {
                self.view.result_index += 1;
            }
            Focus::Selected if self.view.selected_index + 1 < form.selected.len() => {
                self.view.selected_index += 1;
            }
            _ => {}
        }
    }

    pub fn open_create(&mut self) {
        if self.panel.open_create() {
            self.view.focus = Focus::Name;
            self.view.result_index = 0;
            self.view.selected_index = 0;
        }
    }

    pub fn close_create(&mut self) {
        self.panel.close_create();
        self.pending_search = None;
    }

    pub fn edit_name(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(form) = self.panel.form.as_ref() else {
            return;
        };
        let mut name = form.name.clone();
        edit(&mut name);
        self.panel.set_name(name);
    }

    /// Change the search text; the search itself runs once typing pauses
    pub fn edit_query(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(form) = self.panel.form.as_ref() else {
            return;
        };
        let mut query = form.query.clone();
        edit(&mut query);

        self.pending_search = self
            .panel
            .set_query(query)
            .map(|request| (Instant::now(), request));
        self.view.result_index = 0;
    }

    pub fn toggle_current_result(&mut self) {
        let Some(player) = self
            .panel
            .form
            .as_ref()
            .and_then(|form| form.results.get(self.view.result_index))
            .cloned()
        else {
            return;
        };
        self.panel.toggle(&player);
        self.clamp_selected();
    }

    pub fn remove_current_selected(&mut self) {
        let Some(player_id) = self
            .panel
            .form
            .as_ref()
            .and_then(|form| form.selected.get(self.view.selected_index))
            .map(|p| p.id.clone())
        else {
            return;
        };
        self.panel.deselect(&player_id);
        self.clamp_selected();
    }

    fn clamp_selected(&mut self) {
        let len = self.panel.form.as_ref().map_or(0, |f| f.selected.len());
        self.view.selected_index = self.view.selected_index.min(len.saturating_sub(1));
    }

    // ====== Background requests ======

    /// Re-resolve the session; the group list reloads once it arrives
    pub fn refresh(&mut self) {
        let state = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = state
                .session_service
                .current()
                .await
                .map_err(|e| String::from(ApiError::from(e)));
            let _ = tx.send(AppMessage::SessionLoaded(result));
        });
    }

    pub fn load_groups(&mut self) {
        let Some(user_id) = self.panel.begin_load() else {
            return;
        };
        let state = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = state
                .group_service
                .list_for_user(&user_id)
                .await
                .map_err(|e| String::from(ApiError::from(e)));
            let _ = tx.send(AppMessage::GroupsLoaded(result));
        });
    }

    fn search(&self, request: SearchRequest) {
        let state = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = state
                .player_service
                .search(&request.query)
                .await
                .map_err(|e| String::from(ApiError::from(e)));
            let _ = tx.send(AppMessage::SearchDone {
                seq: request.seq,
                result,
            });
        });
    }

    pub fn submit(&mut self) {
        match self.panel.begin_submit() {
            Ok(request) => self.create(request),
            Err(e) => tracing::debug!("Submit refused: {}", e),
        }
    }

    fn create(&self, request: CreateRequest) {
        let state = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = state
                .group_service
                .create(&request.user_id, &request.name, &request.player_ids)
                .await
                .map_err(|e| String::from(ApiError::create_failed(e)));
            let _ = tx.send(AppMessage::CreateDone {
                form_id: request.form_id,
                result,
            });
        });
    }

    /// Called once per frame: fire a debounced search and apply finished work
    pub fn tick(&mut self) {
        if let Some((since, _)) = &self.pending_search {
            if since.elapsed() >= self.debounce {
                if let Some((_, request)) = self.pending_search.take() {
                    self.search(request);
                }
            }
        }

        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
        }

        // One reload covers every group event drained this frame
        let mut reload = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => reload |= Self::changes_groups(&event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event receiver lagged");
                    reload = true;
                }
                Err(_) => break,
            }
        }
        if reload {
            self.load_groups();
        }
    }

    fn changes_groups(event: &DomainEvent) -> bool {
        tracing::trace!(event = event.event_name(), "Panel received event");
        matches!(
            event,
            DomainEvent::GroupCreated { .. }
                | DomainEvent::MembersAdded { .. }
                | DomainEvent::MembersFailed { .. }
        )
    }

    pub fn apply(&mut self, message: AppMessage) {
        match message {
            AppMessage::SessionLoaded(result) => {
                self.panel.set_session(result);
                self.load_groups();
            }
            AppMessage::GroupsLoaded(result) => {
                self.panel.set_groups(result);
                self.view.group_index = self
                    .view
                    .group_index
                    .min(self.panel.groups.len().saturating_sub(1));
            }
            AppMessage::SearchDone { seq, result } => {
                if self.panel.apply_search(seq, result) {
                    let len = self.panel.form.as_ref().map_or(0, |f| f.results.len());
                    self.view.result_index = self.view.result_index.min(len.saturating_sub(1));
                }
            }
            AppMessage::CreateDone { form_id, result } => {
                let created = result.as_ref().ok().map(|o| o.group.id.clone());
                self.panel.finish_submit(form_id, result);
                if let Some(group_id) = created {
                    if let Some(index) = self.panel.groups.iter().position(|g| g.id == group_id) {
                        self.view.group_index = index;
                    }
                }
            }
        }
    }

    /// Wait for the next background result and apply it
    #[cfg(test)]
    pub async fn next_message(&mut self) {
        if let Some(message) = self.rx.recv().await {
            self.apply(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::state::DynSessionProvider;
    use crate::application::eventbus::EventBus;
    use crate::infrastructure::auth::LocalSessionProvider;
    use crate::infrastructure::config::PanelConfig;
    use crate::infrastructure::persistence::sqlite::fixtures::*;
    use crate::infrastructure::persistence::sqlite::{
        SqliteGroupRepository, SqlitePlayerRepository,
    };

    fn app() -> App {
        let db = memory_db();
        insert_player(&db, "p-ada", "u-ada", "Ada Lovelace");
        insert_player(&db, "p-adm", "u-adm", "Admiral Hopper");
        insert_player(&db, "p-me", "me", "My Main");
        insert_group(&db, "g-old", "Old Guard", Some("me"), "2024-01-01T00:00:00Z");
        insert_member(&db, "g-old", "p-me");

        let session: DynSessionProvider = Arc::new(LocalSessionProvider::new(Some("me".into())));
        let state = AppState::new(
            Arc::new(SqlitePlayerRepository::new(db.clone())),
            Arc::new(SqliteGroupRepository::new(db)),
            session,
            EventBus::shared(),
            &PanelConfig::default(),
        );
        App::new(
            Arc::new(state),
            PanelLimits {
                name_max_chars: 64,
                min_search_chars: 1,
            },
            Duration::ZERO,
        )
    }

    #[test]
    fn test_focus_cycles() {
        assert_eq!(Focus::Name.next(), Focus::Search);
        assert_eq!(Focus::Selected.next(), Focus::Name);
        assert_eq!(Focus::Name.prev(), Focus::Selected);
    }

    #[tokio::test]
    async fn test_refresh_loads_session_then_groups() {
        let mut app = app();
        app.refresh();
        app.next_message().await;
        assert_eq!(app.panel.user_id(), Some("me"));
        assert!(app.panel.loading);

        app.next_message().await;
        assert!(!app.panel.loading);
        assert_eq!(app.panel.groups.len(), 1);
        assert_eq!(app.selected_group().map(|g| g.name.as_str()), Some("Old Guard"));
    }

    #[tokio::test]
    async fn test_search_select_and_create() {
        let mut app = app();
        app.refresh();
        app.next_message().await;
        app.next_message().await;

        app.open_create();
        assert!(app.panel.form.is_some());
        app.edit_name(|name| name.push_str("Raid Night"));

        app.edit_query(|q| q.push_str("ad"));
        app.tick();
        app.next_message().await;
        let results: Vec<String> = app.panel.form.as_ref().unwrap()
            .results
            .iter()
            .map(|p| p.id.clone())
            .collect();
        assert_eq!(results, vec!["p-ada", "p-adm"]);

        app.view.focus = Focus::Results;
        app.toggle_current_result();
        app.cursor_down();
        app.toggle_current_result();
        assert_eq!(app.panel.form.as_ref().unwrap().selected.len(), 2);

        app.view.focus = Focus::Selected;
        app.remove_current_selected();
        assert_eq!(app.panel.form.as_ref().unwrap().selected[0].id, "p-adm");

        app.submit();
        app.next_message().await;
        assert!(app.panel.form.is_none());
        assert_eq!(app.panel.groups[0].name, "Raid Night");
        assert_eq!(app.view.group_index, 0);
        let status = app.panel.status.as_ref().unwrap();
        assert_eq!(status.text, "Created group \"Raid Night\" with 1 player(s).");

        // The creation events trigger a single reload from the store
        app.tick();
        app.next_message().await;
        assert!(!app.panel.loading);
        let names: Vec<&str> = app.panel.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Raid Night", "Old Guard"]);
        assert_eq!(app.panel.groups[0].players.len(), 1);
        assert!(app.rx.try_recv().is_err());
    }

    #[test]
    fn test_group_events_request_reload() {
        let created = DomainEvent::GroupCreated {
            group_id: "g1".into(),
            name: "Raid".into(),
        };
        assert!(App::changes_groups(&created));
        let resolved = DomainEvent::SessionResolved {
            user_id: Some("me".into()),
        };
        assert!(!App::changes_groups(&resolved));
    }

    #[tokio::test]
    async fn test_late_create_result_keeps_reopened_modal() {
        let mut app = app();
        app.refresh();
        app.next_message().await;
        app.next_message().await;

        app.open_create();
        app.edit_name(|name| name.push_str("First"));
        app.submit();
        app.close_create();
        app.open_create();
        app.edit_name(|name| name.push_str("Second"));

        app.next_message().await;
        let form = app.panel.form.as_ref().unwrap();
        assert_eq!(form.name, "Second");
        assert!(!form.submitting);
        assert!(form.error.is_none());
        assert_eq!(app.panel.groups[0].name, "First");
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_modal_open() {
        let mut app = app();
        app.refresh();
        app.next_message().await;
        app.next_message().await;

        app.open_create();
        app.edit_name(|name| name.push_str("old guard"));
        app.submit();

        let form = app.panel.form.as_ref().unwrap();
        assert!(!form.submitting);
        assert_eq!(
            form.error.as_deref(),
            Some("You already belong to a group named \"Old Guard\".")
        );
    }

    #[tokio::test]
    async fn test_clearing_query_cancels_pending_search() {
        let mut app = app();
        app.refresh();
        app.next_message().await;

        app.open_create();
        app.edit_query(|q| q.push('a'));
        assert!(app.pending_search.is_some());
        app.edit_query(|q| {
            q.pop();
        });
        assert!(app.pending_search.is_none());
    }
}
