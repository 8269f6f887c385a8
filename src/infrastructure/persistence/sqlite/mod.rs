mod group_repo;
mod player_repo;

pub use group_repo::SqliteGroupRepository;
pub use player_repo::SqlitePlayerRepository;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub type DbConnection = Arc<Mutex<Connection>>;

/// Initialize the SQLite database
pub fn init_database(db_path: &Path) -> anyhow::Result<DbConnection> {
    // Ensure directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Initializing database at {:?}", db_path);

    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    create_schema(&conn)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(Mutex::new(conn)))
}

/// Per-connection setup: enforce join-row references and register `casefold(text)`,
/// a Unicode lowercase used for case-insensitive name search
fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_players_user ON players(user_id);

        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            avatar_url TEXT
        );

        CREATE TABLE IF NOT EXISTS groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            owner_id TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_groups_owner ON groups(owner_id);

        CREATE TABLE IF NOT EXISTS group_players (
            group_id TEXT NOT NULL REFERENCES groups(id),
            player_id TEXT NOT NULL REFERENCES players(id),
            PRIMARY KEY (group_id, player_id)
        );
        CREATE INDEX IF NOT EXISTS idx_group_players_player ON group_players(player_id);",
    )
}

/// "?, ?, ?" for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rusqlite::params;

    pub fn memory_db() -> DbConnection {
        let conn = Connection::open_in_memory().unwrap();
        configure(&conn).unwrap();
        create_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    pub fn insert_player(db: &DbConnection, id: &str, user_id: &str, name: &str) {
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO players (id, user_id, name) VALUES (?, ?, ?)",
                params![id, user_id, name],
            )
            .unwrap();
    }

    pub fn insert_profile(db: &DbConnection, user_id: &str, avatar_url: &str) {
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO profiles (id, avatar_url) VALUES (?, ?)",
                params![user_id, avatar_url],
            )
            .unwrap();
    }

    pub fn insert_group(
        db: &DbConnection,
        id: &str,
        name: &str,
        owner_id: Option<&str>,
        created_at: &str,
    ) {
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO groups (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)",
                params![id, name, owner_id, created_at],
            )
            .unwrap();
    }

    pub fn insert_member(db: &DbConnection, group_id: &str, player_id: &str) {
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO group_players (group_id, player_id) VALUES (?, ?)",
                params![group_id, player_id],
            )
            .unwrap();
    }
}
