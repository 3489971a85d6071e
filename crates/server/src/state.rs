//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::chat::ChatCommands;
use crate::config::{ServerConfig, StoreConfig, TransportConfig};
use crate::db::{self, MemoryStore, PgStore, RecordStore};
use crate::directory::AdminDirectory;
use crate::notify::slack::SlackClient;
use crate::notify::telegram::TelegramClient;
use crate::notify::{ChatTransport, Dispatcher, LogTransport, SlackTransport, TelegramTransport};
use crate::workflow::Workflow;

/// Errors while assembling the state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Arc<ServerConfig>,
    store: Arc<dyn RecordStore>,
    directory: AdminDirectory,
    workflow: Workflow,
    commands: ChatCommands,
    slack: Option<SlackClient>,
    telegram: Option<TelegramClient>,
}

impl AppState {
    /// Build the state from configuration: connect the store and pick the
    /// chat transport.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if the database cannot be reached.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn RecordStore> = match &config.store {
            StoreConfig::Postgres { database_url } => {
                let pool = db::create_pool(database_url).await?;
                tracing::info!("Database pool created");
                Arc::new(PgStore::new(pool))
            }
            StoreConfig::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let http = reqwest::Client::new();
        let transport: Arc<dyn ChatTransport> = match &config.transport {
            TransportConfig::Slack(slack) => Arc::new(SlackTransport::new(SlackClient::new(
                http,
                slack.bot_token.clone(),
                slack.signing_secret.clone(),
            ))),
            TransportConfig::Telegram(telegram) => {
                Arc::new(TelegramTransport::new(TelegramClient::new(
                    http,
                    telegram.bot_token.clone(),
                    telegram.webhook_secret.clone(),
                )))
            }
            TransportConfig::Log => Arc::new(LogTransport),
        };

        Ok(Self::new(config, store, transport))
    }

    /// Assemble the state around an existing store and transport.
    ///
    /// Inbound chat clients for signature and secret checks are still built
    /// from `config.transport`, so real request verification can be paired
    /// with a recording transport.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let config = Arc::new(config);
        let http = reqwest::Client::new();

        let (slack, telegram) = match &config.transport {
            TransportConfig::Slack(slack) => (
                Some(SlackClient::new(
                    http,
                    slack.bot_token.clone(),
                    slack.signing_secret.clone(),
                )),
                None,
            ),
            TransportConfig::Telegram(telegram) => (
                None,
                Some(TelegramClient::new(
                    http,
                    telegram.bot_token.clone(),
                    telegram.webhook_secret.clone(),
                )),
            ),
            TransportConfig::Log => (None, None),
        };

        tracing::info!(transport = transport.name(), "Chat transport ready");

        let directory = AdminDirectory::new(store.clone(), config.routing_cache_ttl);
        let dispatcher = Dispatcher::new(transport, store.clone(), config.notify);
        let workflow = Workflow::new(store.clone(), dispatcher);
        let commands = ChatCommands::new(directory.clone(), store.clone(), config.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                directory,
                workflow,
                commands,
                slack,
                telegram,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn directory(&self) -> &AdminDirectory {
        &self.inner.directory
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.inner.workflow
    }

    #[must_use]
    pub fn commands(&self) -> &ChatCommands {
        &self.inner.commands
    }

    /// Slack client, if Slack is the configured transport.
    #[must_use]
    pub fn slack(&self) -> Option<&SlackClient> {
        self.inner.slack.as_ref()
    }

    /// Telegram client, if Telegram is the configured transport.
    #[must_use]
    pub fn telegram(&self) -> Option<&TelegramClient> {
        self.inner.telegram.as_ref()
    }
}
