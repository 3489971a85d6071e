//! Subcommand implementations.

pub mod admin;
pub mod apply;
pub mod migrate;
pub mod stats;

use secrecy::SecretString;
use thiserror::Error;

use verifydesk_server::db::{self, PgStore, RepositoryError};
use verifydesk_server::directory::DirectoryError;

use crate::client::ClientError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connect to the database named by `DATABASE_URL`.
async fn connect() -> Result<PgStore, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&SecretString::from(database_url)).await?;
    Ok(PgStore::new(pool))
}
