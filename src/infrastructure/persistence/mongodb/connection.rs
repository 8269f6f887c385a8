//! Database handle for the MongoDB backend
//!
//! Players, avatar profiles, groups and membership rows each live in their own
//! collection. Membership rows are unique per (group, player) pair.

use anyhow::Context;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use std::sync::Arc;
use std::time::Duration;

pub(super) const PLAYERS: &str = "players";
pub(super) const PROFILES: &str = "profiles";
pub(super) const GROUPS: &str = "groups";
pub(super) const GROUP_PLAYERS: &str = "group_players";

/// Startup fails fast when nothing answers within this window
const REACH_TIMEOUT: Duration = Duration::from_secs(3);

pub struct MongoConnection {
    database: Database,
}

async fn client_options(uri: &str) -> anyhow::Result<ClientOptions> {
    let mut options = ClientOptions::parse(uri)
        .await
        .with_context(|| format!("Invalid MongoDB URI: {}", uri))?;
    options.connect_timeout = Some(REACH_TIMEOUT);
    options.server_selection_timeout = Some(REACH_TIMEOUT);
    options.app_name = Some("rosterly".to_string());
    Ok(options)
}

impl MongoConnection {
    pub async fn new(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let client = Client::with_options(client_options(uri).await?)?;
        let database = client.database(db_name);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("MongoDB did not answer for database {}", db_name))?;
        tracing::info!(database = db_name, "Connected to MongoDB");

        Ok(Self { database })
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> mongodb::Collection<T> {
        self.database.collection(name)
    }

    /// Membership upserts rely on the pair index; name search relies on `name`
    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let pair = IndexModel::builder()
            .keys(doc! { "group_id": 1, "player_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.database
            .collection::<mongodb::bson::Document>(GROUP_PLAYERS)
            .create_index(pair)
            .await?;

        let by_player = IndexModel::builder().keys(doc! { "player_id": 1 }).build();
        self.database
            .collection::<mongodb::bson::Document>(GROUP_PLAYERS)
            .create_index(by_player)
            .await?;

        let by_owner = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "created_at": -1 })
            .build();
        self.database
            .collection::<mongodb::bson::Document>(GROUPS)
            .create_index(by_owner)
            .await?;

        let by_name = IndexModel::builder().keys(doc! { "name": 1 }).build();
        self.database
            .collection::<mongodb::bson::Document>(PLAYERS)
            .create_index(by_name)
            .await?;
        Ok(())
    }
}

pub async fn init_mongodb(uri: &str, db_name: &str) -> anyhow::Result<Arc<MongoConnection>> {
    let conn = MongoConnection::new(uri, db_name).await?;
    conn.ensure_indexes()
        .await
        .context("Failed to create MongoDB indexes")?;
    Ok(Arc::new(conn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_options_fail_fast() {
        let options = client_options("mongodb://localhost:27017").await.unwrap();
        assert_eq!(options.app_name.as_deref(), Some("rosterly"));
        assert_eq!(options.connect_timeout, Some(REACH_TIMEOUT));
        assert_eq!(options.server_selection_timeout, Some(REACH_TIMEOUT));
    }

    #[tokio::test]
    async fn test_client_options_reject_bad_uri() {
        let err = client_options("postgres://localhost").await.unwrap_err();
        assert!(err.to_string().contains("Invalid MongoDB URI"));
    }
}
