//! Group management panel state.
//!
//! Holds everything the panel shows and validates user input. It performs no
//! I/O: the terminal adapter runs the requests this state hands out and feeds
//! the results back.

use crate::application::service::CreateGroupOutcome;
use crate::domain::model::{validate_group_name, Group, Player, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A player search to run; `seq` identifies it when the result comes back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: String,
}

/// A validated create-group submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// The modal that submitted; its result is routed back by this id
    pub form_id: u64,
    pub user_id: String,
    pub name: String,
    pub player_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PanelLimits {
    pub name_max_chars: usize,
    pub min_search_chars: usize,
}

/// State of the create-group modal
#[derive(Debug, Clone, Default)]
pub struct CreateGroupForm {
    pub name: String,
    pub query: String,
    pub results: Vec<Player>,
    /// Insertion-ordered, unique by player id
    pub selected: Vec<Player>,
    pub searching: bool,
    pub submitting: bool,
    pub error: Option<String>,
    id: u64,
    /// Sequence number of the latest search this form asked for
    search_seq: u64,
}

impl CreateGroupForm {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_selected(&self, player_id: &str) -> bool {
        self.selected.iter().any(|p| p.id == player_id)
    }

    /// Add or remove a player; returns whether the player is now selected
    pub fn toggle(&mut self, player: &Player) -> bool {
        if self.is_selected(&player.id) {
            self.deselect(&player.id);
            false
        } else {
            self.selected.push(player.clone());
            true
        }
    }

    pub fn deselect(&mut self, player_id: &str) {
        self.selected.retain(|p| p.id != player_id);
    }
}

pub struct GroupPanel {
    pub session: Option<Session>,
    pub groups: Vec<Group>,
    pub loading: bool,
    pub status: Option<StatusMessage>,
    pub form: Option<CreateGroupForm>,
    limits: PanelLimits,
    // Both counters span every modal ever opened, so late results from a
    // closed modal never match the open one
    forms_opened: u64,
    searches_issued: u64,
}

impl GroupPanel {
    pub fn new(limits: PanelLimits) -> Self {
        Self {
            session: None,
            groups: Vec::new(),
            loading: false,
            status: None,
            form: None,
            limits,
            forms_opened: 0,
            searches_issued: 0,
        }
    }

    pub fn limits(&self) -> PanelLimits {
        self.limits
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    pub fn set_session(&mut self, result: Result<Option<Session>, String>) {
        match result {
            Ok(Some(session)) => {
                self.session = Some(session);
            }
            Ok(None) => {
                self.session = None;
                self.groups.clear();
                self.status = Some(StatusMessage::new(
                    StatusKind::Warning,
                    "You must be signed in to manage groups.",
                ));
            }
            Err(e) => {
                self.session = None;
                self.groups.clear();
                self.status = Some(StatusMessage::new(
                    StatusKind::Error,
                    format!("Could not load session: {}", e),
                ));
            }
        }
    }

    /// Mark the group list as loading; returns the user to load for
    pub fn begin_load(&mut self) -> Option<String> {
        let user_id = self.user_id()?.to_string();
        self.loading = true;
        Some(user_id)
    }

    pub fn set_groups(&mut self, result: Result<Vec<Group>, String>) {
        self.loading = false;
        match result {
            Ok(groups) => self.groups = groups,
            Err(e) => {
                self.status = Some(StatusMessage::new(
                    StatusKind::Error,
                    format!("Could not load groups: {}", e),
                ));
            }
        }
    }

    /// Open the create-group modal. Requires a session.
    pub fn open_create(&mut self) -> bool {
        if self.session.is_none() {
            self.status = Some(StatusMessage::new(
                StatusKind::Warning,
                "You must be signed in to create groups.",
            ));
            return false;
        }
        if self.form.is_none() {
            self.forms_opened += 1;
            self.form = Some(CreateGroupForm {
                id: self.forms_opened,
                ..CreateGroupForm::default()
            });
        }
        true
    }

    /// Close the modal and discard its contents
    pub fn close_create(&mut self) {
        self.form = None;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if let Some(form) = self.form.as_mut() {
            form.name = name.into();
            form.error = None;
        }
    }

    /// Update the search query; returns the search to run, if any.
    ///
    /// Every call invalidates searches still in flight.
    pub fn set_query(&mut self, query: impl Into<String>) -> Option<SearchRequest> {
        let min_chars = self.limits.min_search_chars.max(1);
        let form = self.form.as_mut()?;

        form.query = query.into();
        self.searches_issued += 1;
        form.search_seq = self.searches_issued;

        let trimmed = form.query.trim();
        if trimmed.chars().count() < min_chars {
            form.results.clear();
            form.searching = false;
            return None;
        }

        form.searching = true;
        Some(SearchRequest {
            seq: form.search_seq,
            query: trimmed.to_string(),
        })
    }

    /// Apply a search result; returns false when it was stale and dropped
    pub fn apply_search(&mut self, seq: u64, result: Result<Vec<Player>, String>) -> bool {
        let Some(form) = self.form.as_mut() else {
            return false;
        };
        if seq != form.search_seq {
            tracing::trace!(seq, current = form.search_seq, "Dropping stale search result");
            return false;
        }

        form.searching = false;
        match result {
            Ok(players) => form.results = players,
            Err(e) => {
                form.results.clear();
                form.error = Some(format!("Search failed: {}", e));
            }
        }
        true
    }

    pub fn toggle(&mut self, player: &Player) -> bool {
        self.form
            .as_mut()
            .map(|form| form.toggle(player))
            .unwrap_or(false)
    }

    pub fn deselect(&mut self, player_id: &str) {
        if let Some(form) = self.form.as_mut() {
            form.deselect(player_id);
        }
    }

    /// Validate the form and hand out the insert to run
    pub fn begin_submit(&mut self) -> Result<CreateRequest, String> {
        let Some(user_id) = self.user_id().map(str::to_string) else {
            return Err("You must be signed in to create groups.".to_string());
        };
        let limits = self.limits;
        let groups = &self.groups;
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| "No group is being created.".to_string())?;

        if form.submitting {
            return Err("Group creation is already in progress.".to_string());
        }

        match validate_group_name(&form.name, groups, limits.name_max_chars) {
            Ok(name) => {
                form.submitting = true;
                form.error = None;
                Ok(CreateRequest {
                    form_id: form.id,
                    user_id,
                    name,
                    player_ids: form.selected.iter().map(|p| p.id.clone()).collect(),
                })
            }
            Err(e) => {
                let message = e.to_string();
                form.error = Some(message.clone());
                Err(message)
            }
        }
    }

    /// Apply a create result. Results for a modal that has since been closed
    /// only touch the status line and the group list.
    pub fn finish_submit(&mut self, form_id: u64, result: Result<CreateGroupOutcome, String>) {
        let from_open_form = self.form.as_ref().is_some_and(|f| f.id == form_id);
        match result {
            Ok(outcome) => {
                if from_open_form {
                    self.form = None;
                }
                self.status = Some(match &outcome.warning {
                    Some(warning) => StatusMessage::new(StatusKind::Warning, warning.clone()),
                    None => StatusMessage::new(
                        StatusKind::Info,
                        format!(
                            "Created group \"{}\" with {} player(s).",
                            outcome.group.name, outcome.members_added
                        ),
                    ),
                });
                if !self.groups.iter().any(|g| g.id == outcome.group.id) {
                    self.groups.insert(0, outcome.group);
                }
            }
            Err(e) => {
                if let Some(form) = self.form.as_mut().filter(|_| from_open_form) {
                    form.submitting = false;
                    form.error = Some(e);
                } else {
                    self.status = Some(StatusMessage::new(StatusKind::Error, e));
                }
            }
        }
    }
}
