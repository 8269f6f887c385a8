use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;

use super::client::{self, eq, in_list, RestClient};
use crate::domain::error::DomainError;
use crate::domain::model::{GroupRecord, Membership, NewGroup};
use crate::domain::repository::{GroupRepository, Result};

const GROUP_COLUMNS: &str = "id,name,owner_id,created_at";

#[derive(Debug, Deserialize)]
struct GroupRow {
    #[serde(deserialize_with = "client::id")]
    id: String,
    name: String,
    #[serde(default, deserialize_with = "client::optional_id")]
    owner_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MembershipRow {
    #[serde(deserialize_with = "client::id")]
    group_id: String,
    #[serde(deserialize_with = "client::id")]
    player_id: String,
}

#[derive(Debug, Serialize)]
struct MembershipInsert<'a> {
    group_id: &'a str,
    player_id: &'a str,
}

pub struct RestGroupRepository {
    client: RestClient,
}

impl RestGroupRepository {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    async fn select_groups(&self, query: &[(&str, String)]) -> Result<Vec<GroupRecord>> {
        let rows: Vec<GroupRow> = self.client.select("groups", query).await?;
        Ok(rows.into_iter().map(GroupRecord::from).collect())
    }
}

#[async_trait]
impl GroupRepository for RestGroupRepository {
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>> {
        self.select_groups(&[
            ("select", GROUP_COLUMNS.to_string()),
            ("owner_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ])
        .await
    }

    async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<MembershipRow> = self
            .client
            .select(
                "group_players",
                &[
                    ("select", "group_id,player_id".to_string()),
                    ("player_id", in_list(player_ids)),
                ],
            )
            .await?;

        let group_ids: Vec<String> = rows
            .into_iter()
            .map(|row| row.group_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select_groups(&[
            ("select", GROUP_COLUMNS.to_string()),
            ("id", in_list(&group_ids)),
            ("order", "created_at.desc".to_string()),
        ])
        .await
    }

    async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<MembershipRow> = self
            .client
            .select(
                "group_players",
                &[
                    ("select", "group_id,player_id".to_string()),
                    ("group_id", in_list(group_ids)),
                    ("order", "group_id.asc,player_id.asc".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Membership {
                group_id: row.group_id,
                player_id: row.player_id,
            })
            .collect())
    }

    async fn create(&self, group: &NewGroup) -> Result<GroupRecord> {
        let rows: Vec<GroupRow> = self
            .client
            .insert("groups", std::slice::from_ref(group))
            .await?;

        rows.into_iter()
            .next()
            .map(GroupRecord::from)
            .ok_or_else(|| DomainError::Backend {
                status: 200,
                message: "insert returned no group row".to_string(),
            })
    }

    async fn add_members(&self, group_id: &str, player_ids: &[String]) -> Result<()> {
        if player_ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<MembershipInsert<'_>> = player_ids
            .iter()
            .map(|player_id| MembershipInsert {
                group_id,
                player_id,
            })
            .collect();

        self.client
            .insert_ignoring_duplicates("group_players", &rows, "group_id,player_id")
            .await
    }
}
