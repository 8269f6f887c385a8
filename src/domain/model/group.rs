use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Player;
use crate::domain::error::DomainError;

/// A row of the groups relation, without its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Group entity - a named collection of players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub players: Vec<Player>,
}

impl Group {
    pub fn from_record(record: GroupRecord, players: Vec<Player>) -> Self {
        Self {
            id: record.id,
            name: record.name,
            owner_id: record.owner_id,
            created_at: record.created_at,
            players,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

/// Join row linking a group and a player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: String,
    pub player_id: String,
}

/// Insert payload for a new group; the store assigns id and timestamp
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    pub name: String,
    pub owner_id: Option<String>,
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Validate a group name against the groups the user already belongs to.
///
/// Returns the trimmed name to store.
pub fn validate_group_name(
    name: &str,
    existing: &[Group],
    max_chars: usize,
) -> Result<String, DomainError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(DomainError::validation("Group name is required."));
    }

    if trimmed.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "Group name must be at most {} characters.",
            max_chars
        )));
    }

    let key = name_key(trimmed);
    if let Some(clash) = existing.iter().find(|g| name_key(&g.name) == key) {
        return Err(DomainError::validation(format!(
            "You already belong to a group named \"{}\".",
            clash.name.trim()
        )));
    }

    Ok(trimmed.to_string())
}

/// Union of owned and joined groups, deduplicated by id, newest first
pub fn merge_groups(owned: Vec<GroupRecord>, joined: Vec<GroupRecord>) -> Vec<GroupRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<GroupRecord> = owned
        .into_iter()
        .chain(joined)
        .filter(|g| seen.insert(g.id.clone()))
        .collect();

    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
    merged
}
