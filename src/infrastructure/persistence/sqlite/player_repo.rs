use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{placeholders, DbConnection};
use crate::domain::error::DomainError;
use crate::domain::model::Player;
use crate::domain::repository::{PlayerRepository, Result};

pub struct SqlitePlayerRepository {
    conn: DbConnection,
}

impl SqlitePlayerRepository {
    pub fn new(conn: DbConnection) -> Self {
        Self { conn }
    }
}

fn map_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        avatar_url: None,
    })
}

#[async_trait]
impl PlayerRepository for SqlitePlayerRepository {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Player>> {
        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, name FROM players
             WHERE user_id = ?
             ORDER BY name COLLATE NOCASE ASC, id ASC",
        )?;

        let players = stmt
            .query_map(params![user_id], map_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>> {
        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        // instr() matches literally; casefold() is registered on every connection
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name FROM players
             WHERE instr(casefold(name), ?1) > 0
             ORDER BY name COLLATE NOCASE ASC, id ASC
             LIMIT ?2",
        )?;

        let players = stmt
            .query_map(params![query.to_lowercase(), limit as i64], map_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let sql = format!(
            "SELECT id, user_id, name FROM players WHERE id IN ({}) ORDER BY name COLLATE NOCASE ASC",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let players = stmt
            .query_map(params_from_iter(ids.iter()), map_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    async fn avatar_url(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let avatar = conn
            .query_row(
                "SELECT avatar_url FROM profiles WHERE id = ?",
                params![user_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;

        Ok(avatar.flatten())
    }
}
