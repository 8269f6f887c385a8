pub mod adapter;
pub mod application;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use adapter::cli::{self, Cli, Command};
use adapter::state::{AppState, DynGroupRepository, DynPlayerRepository, DynSessionProvider};
use adapter::tui;
use application::eventbus::EventBus;
use infrastructure::auth::rest::{persist_tokens, AuthTokens};
use infrastructure::auth::{LocalSessionProvider, RestSessionProvider};
use infrastructure::config::{self, StorageType, UserSettings};
use infrastructure::logging::{self, LogOutput};
use infrastructure::persistence::{self, rest::RestClient};

/// Storage backend chosen at startup
struct StorageBackend {
    player_repo: DynPlayerRepository,
    group_repo: DynGroupRepository,
    session_provider: DynSessionProvider,
    rest_client: Option<RestClient>,
}

/// Initialize storage based on settings
async fn init_storage(settings: &UserSettings) -> anyhow::Result<StorageBackend> {
    let storage = &settings.storage;
    let local_session = || -> DynSessionProvider {
        Arc::new(LocalSessionProvider::new(settings.session.user_id.clone()))
    };

    match storage.storage_type {
        StorageType::Sqlite => {
            let path = storage.sqlite.effective_path();
            tracing::info!("Using SQLite storage backend at {:?}", path);
            let db = persistence::sqlite::init_database(&path)
                .context("Failed to initialize SQLite database")?;

            use persistence::sqlite::{SqliteGroupRepository, SqlitePlayerRepository};

            Ok(StorageBackend {
                player_repo: Arc::new(SqlitePlayerRepository::new(db.clone())),
                group_repo: Arc::new(SqliteGroupRepository::new(db)),
                session_provider: local_session(),
                rest_client: None,
            })
        }
        StorageType::Mongodb => {
            tracing::info!("Using MongoDB storage backend");
            let mongo_config = &storage.mongodb;
            let conn = persistence::mongodb::init_mongodb(&mongo_config.uri, &mongo_config.database)
                .await
                .context("Failed to initialize MongoDB connection")?;

            use persistence::mongodb::{MongoGroupRepository, MongoPlayerRepository};

            Ok(StorageBackend {
                player_repo: Arc::new(MongoPlayerRepository::new(conn.clone())),
                group_repo: Arc::new(MongoGroupRepository::new(conn)),
                session_provider: local_session(),
                rest_client: None,
            })
        }
        StorageType::Rest => {
            tracing::info!(url = %storage.rest.url, "Using hosted REST backend");
            let client = RestClient::new(&storage.rest, &config::app().rest)?;

            use persistence::rest::{RestGroupRepository, RestPlayerRepository};

            let session_provider = RestSessionProvider::new(
                client.clone(),
                settings.session.access_token.clone(),
                settings.session.refresh_token.clone(),
            )
            .with_token_sink(Box::new(|tokens: &AuthTokens| {
                if let Err(e) = persist_tokens(tokens) {
                    tracing::warn!("Failed to save refreshed session: {}", e);
                }
            }));

            Ok(StorageBackend {
                player_repo: Arc::new(RestPlayerRepository::new(client.clone())),
                group_repo: Arc::new(RestGroupRepository::new(client.clone())),
                session_provider: Arc::new(session_provider),
                rest_client: Some(client),
            })
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Command::Panel);

    // The panel owns the terminal, so it logs to file
    let output = if command == Command::Panel {
        LogOutput::File
    } else {
        LogOutput::Console
    };
    logging::setup(output, cli.verbose);

    config::init();

    let mut settings = config::settings().clone();
    cli.apply_overrides(&mut settings);

    let storage = init_storage(&settings).await?;

    let event_bus = EventBus::shared();

    let mut state = AppState::new(
        storage.player_repo,
        storage.group_repo,
        storage.session_provider,
        event_bus,
        &config::app().panel,
    );
    if let Some(client) = storage.rest_client {
        state = state.with_rest_client(client);
    }

    match command {
        Command::Panel => tui::run(Arc::new(state), &config::app().panel).await,
        other => cli::execute(other, &state).await,
    }
}
