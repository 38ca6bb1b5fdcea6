//! Movie catalog endpoints. Reads are public, writes need a session.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::Value;
use std::collections::BTreeMap;

use super::AppState;
use super::response::{ApiError, ApiResponse, json_body, query_params};
use crate::auth::Principal;
use crate::db::StoreError;
use crate::db::schema::{MovieCreate, MoviePage, MovieQuery, MovieRecord, MovieUpdate};
use crate::types::MovieId;

/// Map a store failure for `movie_id`, using `action` in the 500 message.
fn store_error(err: StoreError, movie_id: &MovieId, action: &str) -> ApiError {
    match err {
        StoreError::NotFound => {
            tracing::warn!(movie_id = %movie_id, "movie not found");
            ApiError::NotFound("Movie not found".to_string())
        }
        other => {
            tracing::error!(error = %other, movie_id = %movie_id, "error {} movie", action);
            ApiError::Internal(format!("Error {} movie", action))
        }
    }
}

fn validate_title(title: Option<&str>) -> Result<(), ApiError> {
    match title {
        Some(title) if title.trim().is_empty() => {
            let mut errors = BTreeMap::new();
            errors.insert("title".to_string(), "is required".to_string());
            Err(ApiError::Validation(errors))
        }
        _ => Ok(()),
    }
}

pub async fn create_movie(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<MovieCreate>, JsonRejection>,
) -> Result<ApiResponse<MovieRecord>, ApiError> {
    let input = json_body(payload)?;
    validate_title(Some(&input.title))?;

    let movie = state.movies.create_movie(&input).await.map_err(|e| {
        tracing::error!(error = %e, "error creating movie");
        ApiError::Internal("Error creating movie".to_string())
    })?;

    tracing::info!(movie_id = %movie.movie_id, user_id = %principal.user_id(), "movie created");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Movie created successfully",
        movie,
    ))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> Result<ApiResponse<MovieRecord>, ApiError> {
    let movie = state
        .movies
        .get_movie(&movie_id)
        .await
        .map_err(|e| store_error(e, &movie_id, "getting"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Movie retrieved successfully",
        movie,
    ))
}

pub async fn update_movie(
    State(state): State<AppState>,
    principal: Principal,
    Path(movie_id): Path<MovieId>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> Result<ApiResponse<MovieRecord>, ApiError> {
    let update = json_body(payload)?;
    validate_title(update.title.as_deref())?;

    let movie = state
        .movies
        .update_movie(&movie_id, &update)
        .await
        .map_err(|e| store_error(e, &movie_id, "updating"))?;

    tracing::info!(movie_id = %movie_id, user_id = %principal.user_id(), "movie updated");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Movie updated successfully",
        movie,
    ))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    principal: Principal,
    Path(movie_id): Path<MovieId>,
) -> Result<ApiResponse<Value>, ApiError> {
    state
        .movies
        .delete_movie(&movie_id)
        .await
        .map_err(|e| store_error(e, &movie_id, "deleting"))?;

    tracing::info!(movie_id = %movie_id, user_id = %principal.user_id(), "movie deleted");
    Ok(ApiResponse::empty(StatusCode::OK, "Movie deleted successfully"))
}

pub async fn list_movies(
    State(state): State<AppState>,
    params: Result<Query<MovieQuery>, QueryRejection>,
) -> Result<ApiResponse<MoviePage>, ApiError> {
    let params = query_params(params)?;
    let page = state.movies.list_movies(&params).await.map_err(|e| {
        tracing::error!(error = %e, "error listing movies");
        ApiError::Internal("Error listing movies".to_string())
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Movies retrieved successfully",
        page,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        assert!(validate_title(Some("  ")).is_err());
        assert!(validate_title(Some("Heat")).is_ok());
        assert!(validate_title(None).is_ok());
    }

    #[test]
    fn test_store_error_mapping() {
        let id = MovieId::new("m1");
        assert_eq!(
            store_error(StoreError::NotFound, &id, "getting"),
            ApiError::NotFound("Movie not found".to_string())
        );
        assert_eq!(
            store_error(StoreError::Database("boom".into()), &id, "deleting"),
            ApiError::Internal("Error deleting movie".to_string())
        );
    }
}
