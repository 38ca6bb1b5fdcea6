use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

use crate::types::{MovieId, UserId};

/// Persisted account in the `user` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable identity, also carried in session tokens
    pub user_id: UserId,
    /// Unique login email
    pub email: String,
    /// Argon2id PHC string; never leaves the server
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

impl UserRecord {
    /// Public view of the account without credentials.
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.user_id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Persisted movie in the `movie` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(rename(serialize = "id"))]
    pub movie_id: MovieId,
    pub title: String,
    pub description: String,
    pub release_date: Datetime,
    pub rating: f64,
    /// Running time in minutes
    pub duration: i64,
    pub genre: String,
    pub director: String,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

/// Payload for creating a movie.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_date: DateTime<Utc>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub director: String,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub duration: Option<i64>,
    pub genre: Option<String>,
    pub director: Option<String>,
}

impl MovieUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.release_date.is_none()
            && self.rating.is_none()
            && self.duration.is_none()
            && self.genre.is_none()
            && self.director.is_none()
    }
}

/// Columns a listing may be ordered by.
pub const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "release_date",
    "rating",
    "duration",
    "genre",
    "director",
    "created_at",
];

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Larger requested page sizes are clamped to this.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Filters, ordering and pagination for movie listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl MovieQuery {
    /// Requested page, 1-based. Missing, unparsable or non-positive values fall back to 1.
    pub fn page(&self) -> i64 {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    /// Requested page size in `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> i64 {
        parse_positive(self.page_size.as_deref())
            .map(|size| size.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Rows to skip. Saturates, so a page far past the end reads as empty.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// `ORDER BY` clause built only from whitelisted columns.
    pub fn order_clause(&self) -> String {
        match self.sort_by.as_deref() {
            Some(column) if SORTABLE_COLUMNS.contains(&column) => {
                // `id` is exposed to clients; the stored field is `movie_id`
                let field = if column == "id" { "movie_id" } else { column };
                let direction = match self.order.as_deref() {
                    Some(order) if order.eq_ignore_ascii_case("desc") => "DESC",
                    _ => "ASC",
                };
                format!("ORDER BY {} {}", field, direction)
            }
            _ => "ORDER BY created_at DESC".to_string(),
        }
    }
}

fn parse_positive(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

/// One page of a movie listing.
#[derive(Debug, Clone, Serialize)]
pub struct MoviePage {
    pub movies: Vec<MovieRecord>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl MoviePage {
    pub fn new(movies: Vec<MovieRecord>, total_count: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total_count <= 0 || page_size <= 0 {
            0
        } else {
            (total_count - 1) / page_size + 1
        };
        Self {
            movies,
            total_count,
            page,
            page_size,
            total_pages,
        }
    }
}
