//! Database repository for users, games, and play records.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::error::{DbError, DbErrorKind};
use crate::models::{Game, GamePlayCount, NewGame, NewPlay, NewUser, Play, PlayFilter, User};
use crate::schema;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository over the play-tracking schema.
///
/// Opens a fresh connection per operation and enables SQLite foreign-key
/// enforcement on every connection, so the schema's cascade and set-null
/// actions are always live.
#[derive(Debug, Clone)]
pub struct PlayRepository {
    db_path: String,
}

impl PlayRepository {
    /// Creates a new repository connected to the database at the given path.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests, though
    /// note each operation opens its own connection).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Creating PlayRepository");
        Ok(Self { db_path })
    }

    /// Applies any pending embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails to apply.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> Result<(), DbError> {
        debug!("Applying pending migrations");
        let mut conn = self.connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Other, format!("Migration error: {}", e)))?;
        info!("Schema up to date");
        Ok(())
    }

    /// Establishes a database connection with foreign keys enforced.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)?;
        // SQLite leaves foreign-key enforcement off unless asked per connection.
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        Ok(conn)
    }

    // ---------- Users ----------

    /// Creates a new tracked user.
    ///
    /// The id is auto-assigned, the user starts active, and no full scan is
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with [`DbErrorKind::UniqueViolation`] if the
    /// username is already taken, or if a database error occurs.
    #[instrument(skip(self))]
    pub fn create_user(&self, username: String) -> Result<User, DbError> {
        debug!(username = %username, "Creating user");
        let mut conn = self.connection()?;

        let new_user = NewUser::new(username);

        let user = diesel::insert_into(schema::bgg_users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), username = %user.username(), "User created");
        Ok(user)
    }

    /// Creates a user, or reactivates the existing user with that username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn register_user(&self, username: &str) -> Result<User, DbError> {
        debug!(username = %username, "Registering user");

        if self.get_user_by_name(username)?.is_some() {
            let mut conn = self.connection()?;
            let user = diesel::update(
                schema::bgg_users::table.filter(schema::bgg_users::username.eq(username)),
            )
            .set(schema::bgg_users::is_active.eq(1))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

            info!(user_id = user.id(), username = %username, "User reactivated");
            return Ok(user);
        }

        self.create_user(username.to_string())
    }

    /// Gets a user by username. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        debug!(username = %username, "Looking up user by name");
        let mut conn = self.connection()?;

        let user = schema::bgg_users::table
            .filter(schema::bgg_users::username.eq(username))
            .first::<User>(&mut conn)
            .optional()?;

        if let Some(ref u) = user {
            debug!(user_id = u.id(), "User found");
        } else {
            debug!("User not found");
        }

        Ok(user)
    }

    /// Lists all users, ordered by username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_users(&self) -> Result<Vec<User>, DbError> {
        debug!("Listing all users");
        let mut conn = self.connection()?;

        let users = schema::bgg_users::table
            .order(schema::bgg_users::username.asc())
            .load::<User>(&mut conn)?;

        info!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Lists active users, ordered by username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_active_users(&self) -> Result<Vec<User>, DbError> {
        debug!("Listing active users");
        let mut conn = self.connection()?;

        let users = schema::bgg_users::table
            .filter(schema::bgg_users::is_active.eq(1))
            .order(schema::bgg_users::username.asc())
            .load::<User>(&mut conn)?;

        info!(count = users.len(), "Active users loaded");
        Ok(users)
    }

    /// Soft-disables a user; their plays and row are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn deactivate_user(&self, user_id: i32) -> Result<(), DbError> {
        debug!(user_id = %user_id, "Deactivating user");
        let mut conn = self.connection()?;

        let rows = diesel::update(schema::bgg_users::table.find(user_id))
            .set(schema::bgg_users::is_active.eq(0))
            .execute(&mut conn)?;

        if rows == 0 {
            warn!(user_id = %user_id, "No such user to deactivate");
        } else {
            info!(user_id = %user_id, "User deactivated");
        }
        Ok(())
    }

    /// Deletes a user row outright.
    ///
    /// Their plays survive with the user reference cleared to `NULL`; play
    /// history is independent of user lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn remove_user(&self, user_id: i32) -> Result<usize, DbError> {
        debug!(user_id = %user_id, "Removing user");
        let mut conn = self.connection()?;

        let rows = diesel::delete(schema::bgg_users::table.find(user_id)).execute(&mut conn)?;

        info!(user_id = %user_id, rows = %rows, "User removed");
        Ok(rows)
    }

    /// Records that a full history rebuild completed for the user, stamping
    /// `last_full_scan` with the current local time. Returns the stamp
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the user does not exist or a database error
    /// occurs.
    #[instrument(skip(self))]
    pub fn mark_full_scan(&self, user_id: i32) -> Result<String, DbError> {
        debug!(user_id = %user_id, "Marking full scan complete");
        let mut conn = self.connection()?;

        let stamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        let rows = diesel::update(schema::bgg_users::table.find(user_id))
            .set(schema::bgg_users::last_full_scan.eq(&stamp))
            .execute(&mut conn)?;

        if rows == 0 {
            return Err(DbError::new(
                DbErrorKind::Other,
                format!("No user with id {}", user_id),
            ));
        }

        info!(user_id = %user_id, stamp = %stamp, "Full scan recorded");
        Ok(stamp)
    }

    // ---------- Games ----------

    /// Inserts a game, or refreshes its name and image if the id is already
    /// present. Game ids originate in the external catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game), fields(game_id = game.id()))]
    pub fn upsert_game(&self, game: NewGame) -> Result<Game, DbError> {
        debug!("Upserting game");
        let mut conn = self.connection()?;

        let game = diesel::insert_into(schema::games::table)
            .values(&game)
            .on_conflict(schema::games::id)
            .do_update()
            .set((
                schema::games::name.eq(excluded(schema::games::name)),
                schema::games::image_url.eq(excluded(schema::games::image_url)),
            ))
            .returning(Game::as_returning())
            .get_result(&mut conn)?;

        info!(game_id = game.id(), "Game upserted");
        Ok(game)
    }

    /// Gets a game by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_game(&self, game_id: i32) -> Result<Option<Game>, DbError> {
        debug!(game_id = %game_id, "Looking up game");
        let mut conn = self.connection()?;

        let game = schema::games::table
            .find(game_id)
            .first::<Game>(&mut conn)
            .optional()?;

        Ok(game)
    }

    /// Lists games whose image reference is missing or empty, candidates for
    /// a metadata refresh.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn games_missing_images(&self) -> Result<Vec<Game>, DbError> {
        debug!("Listing games with missing images");
        let mut conn = self.connection()?;

        let games = schema::games::table
            .filter(
                schema::games::image_url
                    .is_null()
                    .or(schema::games::image_url.eq("")),
            )
            .load::<Game>(&mut conn)?;

        info!(count = games.len(), "Games missing images");
        Ok(games)
    }

    /// Sets a game's image reference.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, image_url))]
    pub fn set_game_image(&self, game_id: i32, image_url: String) -> Result<(), DbError> {
        debug!(game_id = %game_id, "Setting game image");
        let mut conn = self.connection()?;

        let rows = diesel::update(schema::games::table.find(game_id))
            .set(schema::games::image_url.eq(image_url))
            .execute(&mut conn)?;

        if rows == 0 {
            warn!(game_id = %game_id, "No such game to update");
        }
        Ok(())
    }

    /// Deletes a game. All plays of that game are deleted with it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_game(&self, game_id: i32) -> Result<usize, DbError> {
        debug!(game_id = %game_id, "Deleting game");
        let mut conn = self.connection()?;

        let rows = diesel::delete(schema::games::table.find(game_id)).execute(&mut conn)?;

        info!(game_id = %game_id, rows = %rows, "Game deleted");
        Ok(rows)
    }

    // ---------- Plays ----------

    /// Records a play. The id originates in the external catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] with [`DbErrorKind::ForeignKeyViolation`] if the
    /// referenced game or user does not exist, or if a database error occurs.
    #[instrument(skip(self, play), fields(play_id = play.id(), game_id = play.game_id(), user_id = play.user_id()))]
    pub fn record_play(&self, play: NewPlay) -> Result<Play, DbError> {
        debug!("Recording play");
        let mut conn = self.connection()?;

        let play = diesel::insert_into(schema::plays::table)
            .values(&play)
            .returning(Play::as_returning())
            .get_result(&mut conn)?;

        info!(play_id = play.id(), game_id = play.game_id(), "Play recorded");
        Ok(play)
    }

    /// Gets a play by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_play(&self, play_id: i32) -> Result<Option<Play>, DbError> {
        debug!(play_id = %play_id, "Looking up play");
        let mut conn = self.connection()?;

        let play = schema::plays::table
            .find(play_id)
            .first::<Play>(&mut conn)
            .optional()?;

        Ok(play)
    }

    /// Rewrites an existing play's game, user, and date, as when the source
    /// amends a record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the play does not exist or a database error
    /// occurs.
    #[instrument(skip(self, play), fields(play_id = play.id()))]
    pub fn update_play(&self, play: NewPlay) -> Result<Play, DbError> {
        debug!("Updating play");
        let mut conn = self.connection()?;

        let play = diesel::update(schema::plays::table.find(*play.id()))
            .set(&play)
            .returning(Play::as_returning())
            .get_result(&mut conn)?;

        info!(play_id = play.id(), "Play updated");
        Ok(play)
    }

    /// Deletes a play by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_play(&self, play_id: i32) -> Result<usize, DbError> {
        debug!(play_id = %play_id, "Deleting play");
        let mut conn = self.connection()?;

        let rows = diesel::delete(schema::plays::table.find(play_id)).execute(&mut conn)?;

        info!(play_id = %play_id, rows = %rows, "Play deleted");
        Ok(rows)
    }

    /// Deletes all plays currently attributed to a user, the first half of a
    /// full history rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_plays_for_user(&self, user_id: i32) -> Result<usize, DbError> {
        debug!(user_id = %user_id, "Clearing plays for user");
        let mut conn = self.connection()?;

        let rows = diesel::delete(
            schema::plays::table.filter(schema::plays::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        info!(user_id = %user_id, rows = %rows, "Plays cleared");
        Ok(rows)
    }

    /// Gets all plays attributed to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn plays_for_user(&self, user_id: i32) -> Result<Vec<Play>, DbError> {
        debug!(user_id = %user_id, "Loading plays for user");
        let mut conn = self.connection()?;

        let plays = schema::plays::table
            .filter(schema::plays::user_id.eq(user_id))
            .order(schema::plays::play_date.desc())
            .load::<Play>(&mut conn)?;

        info!(user_id = %user_id, count = plays.len(), "Plays loaded");
        Ok(plays)
    }

    /// Gets all plays of a game, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn plays_for_game(&self, game_id: i32) -> Result<Vec<Play>, DbError> {
        debug!(game_id = %game_id, "Loading plays for game");
        let mut conn = self.connection()?;

        let plays = schema::plays::table
            .filter(schema::plays::game_id.eq(game_id))
            .order(schema::plays::play_date.desc())
            .load::<Play>(&mut conn)?;

        info!(game_id = %game_id, count = plays.len(), "Plays loaded");
        Ok(plays)
    }

    /// Gets a user's plays dated on or after the cutoff, newest first.
    ///
    /// Dates compare textually, which for ISO-8601 dates matches
    /// chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn plays_on_or_after(&self, user_id: i32, cutoff: &str) -> Result<Vec<Play>, DbError> {
        debug!(user_id = %user_id, cutoff = %cutoff, "Loading plays in window");
        let mut conn = self.connection()?;

        let plays = schema::plays::table
            .filter(schema::plays::user_id.eq(user_id))
            .filter(schema::plays::play_date.ge(cutoff))
            .order(schema::plays::play_date.desc())
            .load::<Play>(&mut conn)?;

        info!(user_id = %user_id, count = plays.len(), "Plays loaded");
        Ok(plays)
    }

    // ---------- Stats ----------

    /// Counts plays per game within the given period, most-played first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn game_play_counts(&self, filter: &PlayFilter) -> Result<Vec<GamePlayCount>, DbError> {
        debug!(filter = ?filter, "Computing play counts per game");
        let mut conn = self.connection()?;

        let mut query = schema::plays::table
            .inner_join(schema::games::table)
            .group_by((
                schema::plays::game_id,
                schema::games::name,
                schema::games::image_url,
            ))
            .select((
                schema::plays::game_id,
                schema::games::name,
                schema::games::image_url,
                count_star(),
            ))
            .order(count_star().desc())
            .into_boxed();

        if let PlayFilter::Date(date) = filter {
            query = query.filter(schema::plays::play_date.eq(date.as_str()));
        } else if let Some(pattern) = filter.prefix_pattern() {
            query = query.filter(schema::plays::play_date.like(pattern));
        }

        let counts = query.load::<GamePlayCount>(&mut conn)?;

        info!(games = counts.len(), "Play counts computed");
        Ok(counts)
    }
}
