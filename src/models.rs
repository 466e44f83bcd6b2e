//! Database models and domain types.

use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;

use crate::schema;

/// Tracked user database model.
///
/// Users are soft-disabled via `is_active` rather than deleted;
/// `last_full_scan` records when their play history was last rebuilt from
/// scratch, or `None` if that has never happened.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::bgg_users)]
pub struct User {
    id: i32,
    username: String,
    is_active: i32,
    last_full_scan: Option<String>,
}

impl User {
    /// Whether the user is currently tracked.
    pub fn active(&self) -> bool {
        self.is_active != 0
    }
}

/// Insertable user model. The database assigns the id and defaults the
/// account to active with no full scan recorded.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::bgg_users)]
pub struct NewUser {
    username: String,
}

/// Game database model.
///
/// The id originates in the external catalog, so name and image may be
/// unknown when metadata could not be resolved.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct Game {
    id: i32,
    name: Option<String>,
    image_url: Option<String>,
}

/// Insertable game model with its externally-assigned id.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGame {
    id: i32,
    name: Option<String>,
    image_url: Option<String>,
}

/// Play record database model.
///
/// `user_id` is `None` once the referenced user has been removed; the play
/// itself survives. `play_date` is stored as the text the source supplied.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::plays)]
#[diesel(belongs_to(Game))]
pub struct Play {
    id: i32,
    game_id: i32,
    user_id: Option<i32>,
    play_date: String,
}

/// Insertable play model with its externally-assigned id.
///
/// A user reference is required at creation even though the stored column is
/// nullable; only removing the user later clears it.
#[derive(Debug, Clone, Insertable, AsChangeset, new, Getters)]
#[diesel(table_name = schema::plays)]
pub struct NewPlay {
    id: i32,
    game_id: i32,
    user_id: i32,
    play_date: String,
}

/// Period filter for play-count aggregation.
///
/// Play dates are stored as ISO-8601 text, so year and month filtering are
/// prefix matches and date filtering is an exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayFilter {
    /// All plays on record.
    Overall,
    /// Plays within a calendar year, e.g. `"2024"`.
    Year(String),
    /// Plays within a calendar month; the month is zero-padded as needed.
    Month {
        /// Four-digit year, e.g. `"2024"`.
        year: String,
        /// Month number, `"1"` through `"12"`.
        month: String,
    },
    /// Plays on an exact date, e.g. `"2024-01-01"`.
    Date(String),
}

impl PlayFilter {
    /// The `LIKE` prefix pattern for year and month filters, `None` for the
    /// other variants.
    pub(crate) fn prefix_pattern(&self) -> Option<String> {
        match self {
            Self::Overall | Self::Date(_) => None,
            Self::Year(year) => Some(format!("{year}-%")),
            Self::Month { year, month } => Some(format!("{year}-{month:0>2}-%")),
        }
    }
}

/// One row of the per-game play-count aggregation, most-played games first.
#[derive(Debug, Clone, Queryable, Getters)]
pub struct GamePlayCount {
    game_id: i32,
    name: Option<String>,
    image_url: Option<String>,
    play_count: i64,
}
