use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Row};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use ulid::Ulid;

use super::{parse_timestamp, placeholders, DbConnection};
use crate::domain::error::DomainError;
use crate::domain::model::{GroupRecord, Membership, NewGroup};
use crate::domain::repository::{GroupRepository, Result};

pub struct SqliteGroupRepository {
    conn: DbConnection,
}

impl SqliteGroupRepository {
    pub fn new(conn: DbConnection) -> Self {
        Self { conn }
    }
}

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRecord> {
    let created_at: String = row.get(3)?;
    Ok(GroupRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>> {
        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, name, owner_id, created_at FROM groups
             WHERE owner_id = ?
             ORDER BY created_at DESC",
        )?;

        let groups = stmt
            .query_map(params![user_id], map_group)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let sql = format!(
            "SELECT DISTINCT g.id, g.name, g.owner_id, g.created_at
             FROM groups g
             JOIN group_players gp ON gp.group_id = g.id
             WHERE gp.player_id IN ({})
             ORDER BY g.created_at DESC",
            placeholders(player_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let groups = stmt
            .query_map(params_from_iter(player_ids.iter()), map_group)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let sql = format!(
            "SELECT group_id, player_id FROM group_players
             WHERE group_id IN ({})
             ORDER BY group_id, player_id",
            placeholders(group_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(group_ids.iter()), |row| {
                Ok(Membership {
                    group_id: row.get(0)?,
                    player_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn create(&self, group: &NewGroup) -> Result<GroupRecord> {
        let record = GroupRecord {
            id: Ulid::new().to_string(),
            name: group.name.clone(),
            owner_id: group.owner_id.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let created_at = record
            .created_at
            .format(&Rfc3339)
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO groups (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)",
            params![record.id, record.name, record.owner_id, created_at],
        )?;

        Ok(record)
    }

    async fn add_members(&self, group_id: &str, player_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock().map_err(|e| DomainError::Database(e.to_string()))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO group_players (group_id, player_id) VALUES (?, ?)",
            )?;
            for player_id in player_ids {
                stmt.execute(params![group_id, player_id])?;
            }
        }
        tx.commit()?;

        Ok(())
    }
}
