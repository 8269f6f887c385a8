//! MongoDB Group Repository implementation
//!
//! Groups live in `groups`, membership rows in `group_players`. Membership
//! writes are upserts so repeating them is harmless.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use std::collections::HashSet;
use std::sync::Arc;
use time::OffsetDateTime;
use ulid::Ulid;

use super::connection::{GROUPS, GROUP_PLAYERS};
use super::MongoConnection;
use crate::domain::model::{GroupRecord, Membership, NewGroup};
use crate::domain::repository::{GroupRepository, Result};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct GroupDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    owner_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl From<GroupDocument> for GroupRecord {
    fn from(doc: GroupDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            owner_id: doc.owner_id,
            created_at: doc.created_at,
        }
    }
}

pub struct MongoGroupRepository {
    groups: Collection<GroupDocument>,
    members: Collection<Membership>,
}

impl MongoGroupRepository {
    pub fn new(conn: Arc<MongoConnection>) -> Self {
        Self {
            groups: conn.collection(GROUPS),
            members: conn.collection(GROUP_PLAYERS),
        }
    }
}

#[async_trait]
impl GroupRepository for MongoGroupRepository {
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>> {
        let cursor = self
            .groups
            .find(doc! { "owner_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await?;

        let docs: Vec<GroupDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(GroupRecord::from).collect())
    }

    async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self
            .members
            .find(doc! { "player_id": { "$in": player_ids.to_vec() } })
            .await?;
        let rows: Vec<Membership> = cursor.try_collect().await?;

        let group_ids: Vec<String> = rows
            .into_iter()
            .map(|m| m.group_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self
            .groups
            .find(doc! { "_id": { "$in": group_ids } })
            .sort(doc! { "created_at": -1 })
            .await?;

        let docs: Vec<GroupDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(GroupRecord::from).collect())
    }

    async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self
            .members
            .find(doc! { "group_id": { "$in": group_ids.to_vec() } })
            .sort(doc! { "group_id": 1, "player_id": 1 })
            .await?;

        let rows: Vec<Membership> = cursor.try_collect().await?;
        Ok(rows)
    }

    async fn create(&self, group: &NewGroup) -> Result<GroupRecord> {
        let doc = GroupDocument {
            id: Ulid::new().to_string(),
            name: group.name.clone(),
            owner_id: group.owner_id.clone(),
            created_at: OffsetDateTime::now_utc(),
        };

        self.groups.insert_one(&doc).await?;

        Ok(doc.into())
    }

    async fn add_members(&self, group_id: &str, player_ids: &[String]) -> Result<()> {
        for player_id in player_ids {
            let key = doc! { "group_id": group_id, "player_id": player_id.as_str() };
            self.members
                .update_one(key.clone(), doc! { "$setOnInsert": key })
                .upsert(true)
                .await?;
        }

        Ok(())
    }
}
