//! SQLite persistence layer for board-game play records.
//!
//! Tracks which users played which games on which dates, as recorded against
//! an external board-game catalog. The crate owns the schema, applies it via
//! embedded migrations, and exposes a typed repository over it with SQLite
//! foreign-key enforcement always on, so deleting a game removes its plays
//! while deleting a user leaves their play history behind with the user
//! reference cleared.
//!
//! # Example
//!
//! ```no_run
//! use bgg_tracker::{NewGame, NewPlay, PlayRepository};
//!
//! # fn example() -> Result<(), bgg_tracker::DbError> {
//! let repo = PlayRepository::new("bgg_group.db".to_string())?;
//! repo.initialize()?;
//!
//! let user = repo.register_user("alice")?;
//! repo.upsert_game(NewGame::new(100, Some("Chess".to_string()), None))?;
//! repo.record_play(NewPlay::new(1, 100, *user.id(), "2024-01-01".to_string()))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod error;
mod models;
mod repository;
mod schema;

// Crate-level exports via pub use
pub use config::TrackerConfig;
pub use error::{DbError, DbErrorKind};
pub use models::{Game, GamePlayCount, NewGame, NewPlay, NewUser, Play, PlayFilter, User};
pub use repository::PlayRepository;
