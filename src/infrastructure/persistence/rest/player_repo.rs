use async_trait::async_trait;
use serde::Deserialize;

use super::client::{self, eq, ilike_contains, in_list, RestClient};
use crate::domain::model::Player;
use crate::domain::repository::{PlayerRepository, Result};

const PLAYER_COLUMNS: &str = "id,user_id,name";

#[derive(Debug, Deserialize)]
struct PlayerRow {
    #[serde(deserialize_with = "client::id")]
    id: String,
    #[serde(deserialize_with = "client::id")]
    user_id: String,
    name: String,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    avatar_url: Option<String>,
}

pub struct RestPlayerRepository {
    client: RestClient,
}

impl RestPlayerRepository {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    async fn select_players(&self, query: &[(&str, String)]) -> Result<Vec<Player>> {
        let rows: Vec<PlayerRow> = self.client.select("players", query).await?;
        Ok(rows.into_iter().map(Player::from).collect())
    }
}

#[async_trait]
impl PlayerRepository for RestPlayerRepository {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Player>> {
        self.select_players(&[
            ("select", PLAYER_COLUMNS.to_string()),
            ("user_id", eq(user_id)),
            ("order", "name.asc,id.asc".to_string()),
        ])
        .await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>> {
        self.select_players(&[
            ("select", PLAYER_COLUMNS.to_string()),
            ("name", ilike_contains(query)),
            ("order", "name.asc,id.asc".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.select_players(&[
            ("select", PLAYER_COLUMNS.to_string()),
            ("id", in_list(ids)),
            ("order", "name.asc".to_string()),
        ])
        .await
    }

    async fn avatar_url(&self, user_id: &str) -> Result<Option<String>> {
        let rows: Vec<ProfileRow> = self
            .client
            .select(
                "profiles",
                &[
                    ("select", "avatar_url".to_string()),
                    ("id", eq(user_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.avatar_url)
            .filter(|url| !url.is_empty()))
    }
}
