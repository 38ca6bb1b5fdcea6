use serde::Deserialize;
use std::time::Duration;
use surrealdb::sql::Datetime;

use crate::db::schema::{MovieCreate, MoviePage, MovieQuery, MovieRecord, MovieUpdate};
use crate::db::{Db, StoreError, StoreResult, with_timeout};
use crate::types::MovieId;

/// Movie store backed by the `movie` table.
#[derive(Clone)]
pub struct MovieStore {
    db: Db,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: i64,
}

impl MovieStore {
    pub fn new(db: Db, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub async fn create_movie(&self, input: &MovieCreate) -> StoreResult<MovieRecord> {
        let query = r#"
            CREATE movie CONTENT {
                movie_id: $movie_id,
                title: $title,
                description: $description,
                release_date: $release_date,
                rating: $rating,
                duration: $duration,
                genre: $genre,
                director: $director,
                created_at: time::now(),
                updated_at: time::now()
            }
        "#;

        let mut res = with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("movie_id", MovieId::generate().into_inner()))
                .bind(("title", input.title.trim().to_string()))
                .bind(("description", input.description.clone()))
                .bind(("release_date", Datetime::from(input.release_date)))
                .bind(("rating", input.rating))
                .bind(("duration", input.duration))
                .bind(("genre", input.genre.clone()))
                .bind(("director", input.director.clone())),
        )
        .await?;

        let movies: Vec<MovieRecord> = res.take(0)?;
        let movie = movies
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database("failed to create movie".to_string()))?;

        tracing::debug!(movie_id = %movie.movie_id, "movie created");
        Ok(movie)
    }

    /// Fetch one movie. Fails with [`StoreError::NotFound`] for unknown ids.
    pub async fn get_movie(&self, movie_id: &MovieId) -> StoreResult<MovieRecord> {
        let query = "SELECT * FROM movie WHERE movie_id = $movie_id LIMIT 1";

        let mut res = with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("movie_id", movie_id.as_str().to_string())),
        )
        .await?;

        let movies: Vec<MovieRecord> = res.take(0)?;
        movies.into_iter().next().ok_or(StoreError::NotFound)
    }

    /// Apply the fields present in `update`, leaving the rest untouched.
    ///
    /// An empty update writes nothing and returns the stored movie.
    pub async fn update_movie(&self, movie_id: &MovieId, update: &MovieUpdate) -> StoreResult<MovieRecord> {
        if update.is_empty() {
            return self.get_movie(movie_id).await;
        }

        let mut assignments = Vec::new();
        if update.title.is_some() {
            assignments.push("title = $title");
        }
        if update.description.is_some() {
            assignments.push("description = $description");
        }
        if update.release_date.is_some() {
            assignments.push("release_date = $release_date");
        }
        if update.rating.is_some() {
            assignments.push("rating = $rating");
        }
        if update.duration.is_some() {
            assignments.push("duration = $duration");
        }
        if update.genre.is_some() {
            assignments.push("genre = $genre");
        }
        if update.director.is_some() {
            assignments.push("director = $director");
        }
        assignments.push("updated_at = time::now()");

        let sql = format!(
            "UPDATE movie SET {} WHERE movie_id = $movie_id RETURN AFTER",
            assignments.join(", ")
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("movie_id", movie_id.as_str().to_string()));
        if let Some(title) = &update.title {
            query = query.bind(("title", title.trim().to_string()));
        }
        if let Some(description) = &update.description {
            query = query.bind(("description", description.clone()));
        }
        if let Some(release_date) = update.release_date {
            query = query.bind(("release_date", Datetime::from(release_date)));
        }
        if let Some(rating) = update.rating {
            query = query.bind(("rating", rating));
        }
        if let Some(duration) = update.duration {
            query = query.bind(("duration", duration));
        }
        if let Some(genre) = &update.genre {
            query = query.bind(("genre", genre.clone()));
        }
        if let Some(director) = &update.director {
            query = query.bind(("director", director.clone()));
        }

        let mut res = with_timeout(self.timeout, query).await?;
        let movies: Vec<MovieRecord> = res.take(0)?;
        let movie = movies.into_iter().next().ok_or(StoreError::NotFound)?;

        tracing::debug!(movie_id = %movie.movie_id, fields = assignments.len() - 1, "movie updated");
        Ok(movie)
    }

    /// Remove a movie. Fails with [`StoreError::NotFound`] when nothing was deleted.
    pub async fn delete_movie(&self, movie_id: &MovieId) -> StoreResult<()> {
        let query = "DELETE movie WHERE movie_id = $movie_id RETURN BEFORE";

        let mut res = with_timeout(
            self.timeout,
            self.db
                .query(query)
                .bind(("movie_id", movie_id.as_str().to_string())),
        )
        .await?;

        let deleted: Vec<MovieRecord> = res.take(0)?;
        if deleted.is_empty() {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(movie_id = %movie_id, "movie deleted");
        Ok(())
    }

    /// Filtered, ordered page of movies plus the total match count.
    pub async fn list_movies(&self, params: &MovieQuery) -> StoreResult<MoviePage> {
        let filters: Vec<(&str, &str)> = [
            ("title", params.title.as_deref()),
            ("genre", params.genre.as_deref()),
            ("director", params.director.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.filter(|v| !v.is_empty()).map(|v| (field, v)))
        .collect();

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            let conditions: Vec<String> = filters
                .iter()
                .map(|(field, _)| {
                    format!("string::lowercase({field}) CONTAINS string::lowercase(${field})")
                })
                .collect();
            format!("WHERE {}", conditions.join(" AND "))
        };

        let page = params.page();
        let page_size = params.page_size();

        let sql = format!(
            "SELECT * FROM movie {where_clause} {order} LIMIT $limit START $start;
             SELECT count() AS total FROM movie {where_clause} GROUP ALL;",
            order = params.order_clause(),
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("limit", page_size))
            .bind(("start", params.offset()));
        for (field, value) in &filters {
            query = query.bind((field.to_string(), value.to_string()));
        }

        let mut res = with_timeout(self.timeout, query).await?;
        let movies: Vec<MovieRecord> = res.take(0)?;
        let counts: Vec<CountRow> = res.take(1)?;
        let total_count = counts.first().map(|row| row.total).unwrap_or(0);

        Ok(MoviePage::new(movies, total_count, page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use chrono::{TimeZone, Utc};

    async fn setup_store() -> MovieStore {
        let config = DatabaseConfig::default();
        let db = create_connection(&config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        MovieStore::new(db, config.timeout)
    }

    fn movie(title: &str, genre: &str, director: &str, rating: f64) -> MovieCreate {
        MovieCreate {
            title: title.to_string(),
            description: format!("{title} description"),
            release_date: Utc.with_ymd_and_hms(1999, 3, 31, 0, 0, 0).unwrap(),
            rating,
            duration: 136,
            genre: genre.to_string(),
            director: director.to_string(),
        }
    }

    async fn seed(store: &MovieStore) {
        for input in [
            movie("The Matrix", "Sci-Fi", "Wachowski", 8.7),
            movie("Heat", "Crime", "Michael Mann", 8.3),
            movie("Collateral", "Crime", "Michael Mann", 7.5),
            movie("Alien", "Sci-Fi", "Ridley Scott", 8.5),
        ] {
            store.create_movie(&input).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_and_get_movie() {
        let store = setup_store().await;

        let created = store.create_movie(&movie("Heat", "Crime", "Michael Mann", 8.3)).await.unwrap();
        assert_eq!(created.title, "Heat");
        assert!(created.created_at.is_some());

        let fetched = store.get_movie(&created.movie_id).await.unwrap();
        assert_eq!(fetched.movie_id, created.movie_id);
        assert_eq!(fetched.duration, 136);
    }

    #[tokio::test]
    async fn test_get_unknown_movie_is_not_found() {
        let store = setup_store().await;
        let err = store.get_movie(&MovieId::new("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let store = setup_store().await;
        let created = store.create_movie(&movie("Heat", "Crime", "Michael Mann", 8.3)).await.unwrap();

        let update = MovieUpdate {
            rating: Some(9.0),
            ..Default::default()
        };
        let updated = store.update_movie(&created.movie_id, &update).await.unwrap();

        assert_eq!(updated.rating, 9.0);
        assert_eq!(updated.title, "Heat");
        assert_eq!(updated.director, "Michael Mann");
    }

    #[tokio::test]
    async fn test_empty_update_returns_current_movie() {
        let store = setup_store().await;
        let created = store.create_movie(&movie("Heat", "Crime", "Michael Mann", 8.3)).await.unwrap();

        let unchanged = store
            .update_movie(&created.movie_id, &MovieUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged.title, created.title);
        assert_eq!(unchanged.rating, created.rating);
    }

    #[tokio::test]
    async fn test_update_unknown_movie_is_not_found() {
        let store = setup_store().await;
        let update = MovieUpdate {
            title: Some("Nope".to_string()),
            ..Default::default()
        };
        let err = store
            .update_movie(&MovieId::new("missing"), &update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_movie() {
        let store = setup_store().await;
        let created = store.create_movie(&movie("Heat", "Crime", "Michael Mann", 8.3)).await.unwrap();

        store.delete_movie(&created.movie_id).await.unwrap();
        assert!(matches!(
            store.get_movie(&created.movie_id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_movie(&created.movie_id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_case_insensitively() {
        let store = setup_store().await;
        seed(&store).await;

        let page = store
            .list_movies(&MovieQuery {
                director: Some("michael".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert!(page.movies.iter().all(|m| m.director == "Michael Mann"));
    }

    #[tokio::test]
    async fn test_list_sorts_and_paginates() {
        let store = setup_store().await;
        seed(&store).await;

        let page = store
            .list_movies(&MovieQuery {
                sort_by: Some("rating".to_string()),
                order: Some("desc".to_string()),
                page: Some("2".to_string()),
                page_size: Some("3".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.movies[0].title, "Collateral");
    }

    #[tokio::test]
    async fn test_list_empty_catalog() {
        let store = setup_store().await;
        let page = store.list_movies(&MovieQuery::default()).await.unwrap();

        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.movies.is_empty());
    }
}
