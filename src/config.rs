//! Environment-backed configuration.

use derive_getters::Getters;
use derive_new::new;
use tracing::{debug, info, instrument};

use crate::error::DbError;
use crate::repository::PlayRepository;

/// Environment variable naming the SQLite database file.
const DB_PATH_VAR: &str = "BGG_DB_PATH";

/// Database file used when the environment does not name one.
const DEFAULT_DB_PATH: &str = "bgg_group.db";

/// Tracker configuration.
#[derive(Debug, Clone, Getters, new)]
pub struct TrackerConfig {
    /// Path to the SQLite database file.
    db_path: String,
}

impl TrackerConfig {
    /// Loads configuration from the environment, reading a `.env` file first
    /// if one is present. Falls back to `bgg_group.db` in the working
    /// directory when `BGG_DB_PATH` is unset.
    #[instrument]
    pub fn from_env() -> Self {
        // A missing .env file is not an error; the process environment wins.
        dotenvy::dotenv().ok();

        let db_path = match std::env::var(DB_PATH_VAR) {
            Ok(path) => path,
            Err(_) => {
                debug!(var = %DB_PATH_VAR, "Variable unset, using default database path");
                DEFAULT_DB_PATH.to_string()
            }
        };

        info!(db_path = %db_path, "Configuration loaded");
        Self { db_path }
    }

    /// Creates a repository for the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(self), fields(db_path = %self.db_path))]
    pub fn repository(&self) -> Result<PlayRepository, DbError> {
        PlayRepository::new(self.db_path.clone())
    }
}
