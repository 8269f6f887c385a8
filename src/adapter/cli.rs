use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::adapter::error::ApiError;
use crate::adapter::state::AppState;
use crate::infrastructure::auth::rest::{persist_tokens, sign_in_with_password};
use crate::infrastructure::config::{StorageType, UserSettings};

#[derive(Parser)]
#[command(name = "rosterly", version)]
#[command(about = "Build player groups from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Storage backend: sqlite, mongodb or rest. Overrides settings.yaml.
    #[arg(long, env = "ROSTERLY_BACKEND", global = true)]
    pub backend: Option<StorageType>,

    /// Act as this user on the local backends
    #[arg(long, env = "ROSTERLY_USER", global = true)]
    pub user: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the group panel - Default
    Panel,
    /// Print your groups and their players as JSON
    Groups,
    /// Search players by name
    Search { query: String },
    /// Create a group, optionally adding players by id
    CreateGroup {
        #[arg(long)]
        name: String,
        #[arg(long = "player", value_name = "PLAYER_ID")]
        players: Vec<String>,
    },
    /// Show who is signed in
    Whoami,
    /// Sign in to the hosted backend and remember the session
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ROSTERLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded settings
    pub fn apply_overrides(&self, settings: &mut UserSettings) {
        if let Some(backend) = self.backend {
            settings.storage.storage_type = backend;
        }
        if let Some(user) = &self.user {
            settings.session.user_id = Some(user.clone());
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(err: impl Into<ApiError>) -> anyhow::Error {
    anyhow::anyhow!(err.into().message)
}

/// Run a one-shot command against the configured backend
pub async fn execute(command: Command, state: &AppState) -> anyhow::Result<()> {
    match command {
        Command::Panel => anyhow::bail!("the panel needs an interactive terminal"),
        Command::Groups => {
            let session = state.session_service.require().await.map_err(fail)?;
            let groups = state
                .group_service
                .list_for_user(&session.user_id)
                .await
                .map_err(fail)?;
            print_json(&groups)
        }
        Command::Search { query } => {
            let players = state.player_service.search(&query).await.map_err(fail)?;
            print_json(&players)
        }
        Command::CreateGroup { name, players } => {
            let session = state.session_service.require().await.map_err(fail)?;
            let outcome = state
                .group_service
                .create(&session.user_id, &name, &players)
                .await
                .map_err(|e| fail(ApiError::create_failed(e)))?;
            if let Some(warning) = &outcome.warning {
                eprintln!("Warning: {}", warning);
            }
            print_json(&outcome)
        }
        Command::Whoami => {
            let session = state.session_service.current().await.map_err(fail)?;
            print_json(&session)
        }
        Command::SignIn { email, password } => {
            let client = state
                .rest_client
                .as_ref()
                .context("sign-in needs the rest backend (--backend rest)")?;
            let tokens = sign_in_with_password(client, email.trim(), &password)
                .await
                .map_err(fail)?;
            persist_tokens(&tokens).context("Failed to save session")?;
            println!(
                "Signed in as {}",
                tokens.user.email.as_deref().unwrap_or(&tokens.user.id)
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::state::DynSessionProvider;
    use crate::application::eventbus::EventBus;
    use crate::infrastructure::auth::LocalSessionProvider;
    use crate::infrastructure::config::PanelConfig;
    use crate::infrastructure::persistence::sqlite::fixtures::*;
    use crate::infrastructure::persistence::sqlite::{
        SqliteGroupRepository, SqlitePlayerRepository,
    };
    use std::sync::Arc;

    fn state(user: Option<&str>) -> AppState {
        let db = memory_db();
        insert_player(&db, "p1", "u1", "Ada Lovelace");
        let session: DynSessionProvider =
            Arc::new(LocalSessionProvider::new(user.map(str::to_string)));
        AppState::new(
            Arc::new(SqlitePlayerRepository::new(db.clone())),
            Arc::new(SqliteGroupRepository::new(db)),
            session,
            EventBus::shared(),
            &PanelConfig::default(),
        )
    }

    #[test]
    fn test_parse_create_group() {
        let cli = Cli::try_parse_from([
            "rosterly",
            "--backend",
            "sqlite",
            "create-group",
            "--name",
            "Raid",
            "--player",
            "p1",
            "--player",
            "p2",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(StorageType::Sqlite));
        assert_eq!(
            cli.command,
            Some(Command::CreateGroup {
                name: "Raid".into(),
                players: vec!["p1".into(), "p2".into()],
            })
        );
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from(["rosterly", "groups", "--backend", "mongo", "--user", "u9"])
            .unwrap();
        let mut settings = UserSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.storage.storage_type, StorageType::Mongodb);
        assert_eq!(settings.session.user_id.as_deref(), Some("u9"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["rosterly", "--backend", "csv"]).is_err());
    }

    #[tokio::test]
    async fn test_groups_requires_session() {
        let err = execute(Command::Groups, &state(None)).await.unwrap_err();
        assert_eq!(err.to_string(), "You must be signed in to manage groups.");
    }

    #[tokio::test]
    async fn test_create_group_rejects_blank_name() {
        let err = execute(
            Command::CreateGroup {
                name: "   ".into(),
                players: vec![],
            },
            &state(Some("u1")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Group name is required.");
    }

    #[tokio::test]
    async fn test_sign_in_needs_rest_backend() {
        let err = execute(
            Command::SignIn {
                email: "ada@example.com".into(),
                password: "secret".into(),
            },
            &state(None),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("rest backend"));
    }
}
