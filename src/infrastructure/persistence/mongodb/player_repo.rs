//! MongoDB Player Repository implementation
//!
//! Uses `_id` as primary key (mapped from Player.id). Avatars live in the
//! `profiles` collection keyed by user id.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use std::sync::Arc;

use super::connection::{PLAYERS, PROFILES};
use super::{escape_regex, MongoConnection};
use crate::domain::model::Player;
use crate::domain::repository::{PlayerRepository, Result};

/// MongoDB document wrapper for Player with _id field
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct PlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    name: String,
}

impl From<PlayerDocument> for Player {
    fn from(doc: PlayerDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            name: doc.name,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ProfileDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

pub struct MongoPlayerRepository {
    players: Collection<PlayerDocument>,
    profiles: Collection<ProfileDocument>,
}

impl MongoPlayerRepository {
    pub fn new(conn: Arc<MongoConnection>) -> Self {
        Self {
            players: conn.collection(PLAYERS),
            profiles: conn.collection(PROFILES),
        }
    }
}

#[async_trait]
impl PlayerRepository for MongoPlayerRepository {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Player>> {
        let cursor = self
            .players
            .find(doc! { "user_id": user_id })
            .sort(doc! { "name": 1, "_id": 1 })
            .await?;

        let docs: Vec<PlayerDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Player::from).collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>> {
        let filter = doc! {
            "name": { "$regex": escape_regex(query), "$options": "i" }
        };

        let cursor = self
            .players
            .find(filter)
            .sort(doc! { "name": 1, "_id": 1 })
            .limit(limit as i64)
            .await?;

        let docs: Vec<PlayerDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Player::from).collect())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self
            .players
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .sort(doc! { "name": 1 })
            .await?;

        let docs: Vec<PlayerDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Player::from).collect())
    }

    async fn avatar_url(&self, user_id: &str) -> Result<Option<String>> {
        let profile = self.profiles.find_one(doc! { "_id": user_id }).await?;
        Ok(profile.and_then(|p| p.avatar_url))
    }
}
