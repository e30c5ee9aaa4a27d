use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{Film, FilmFields, FilterKind, MAX_RATING, MIN_RATING},
    validation,
};

type JsonBody = WithRejection<Json<Value>, AppError>;

pub fn router(state: Arc<AppState>) -> Router {
    let films = Router::new()
        .route("/films", get(list_films).post(create_film))
        .route("/films/change-rating", post(change_rating))
        .route("/films/{id}", get(get_film).put(update_film).delete(delete_film))
        .route("/films/{id}/favorite", put(set_favorite))
        .route("/searchFilms", get(search_films));

    let prefix = state.config.api_prefix.as_str();
    let api = if prefix == "/" { films } else { Router::new().nest(prefix, films) };

    api.route("/health", get(health)).with_state(state)
}

pub async fn health() -> &'static str {
    "healthy"
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    filter: Option<String>,
    #[serde(rename = "titleSubstring")]
    title_substring: Option<String>,
}

pub async fn list_films(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Film>>> {
    if let Some(term) = q.title_substring {
        let term = validation::search_term(&term)?;
        return Ok(Json(state.films.search(&term).await?));
    }

    let filter = match q.filter.as_deref() {
        None | Some("") => FilterKind::default(),
        Some(raw) => raw.parse()?,
    };
    Ok(Json(state.films.list(filter).await?))
}

pub async fn search_films(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let term = validation::search_term(q.title_substring.as_deref().unwrap_or_default())?;
    Ok(Json(state.films.search(&term).await?))
}

pub async fn get_film(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Film>> {
    let id = validation::film_id(&raw_id)?;
    let film = state.films.get(id).await.map_err(AppError::LookupFailed)?;
    film.map(Json).ok_or(AppError::NotFound)
}

pub async fn create_film(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Film>> {
    let fields = validation::create_request(&body)?;
    let film = state.films.create(fields).await?;
    tracing::info!(id = film.id, title = %film.title, "film created");
    Ok(Json(film))
}

pub async fn update_film(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Film>> {
    let (id, changes) = validation::update_request(&raw_id, &body)?;
    if validation::body_id_conflicts(&body, id) {
        return Err(AppError::IdMismatch);
    }

    let stored = state.films.get(id).await?.ok_or(AppError::NotFound)?;
    let film = state.films.update(id, changes.merge_into(stored)).await?;
    film.map(Json).ok_or(AppError::NotFound)
}

pub async fn set_favorite(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Film>> {
    let (id, favorite) = validation::favorite_request(&raw_id, &body)?;
    if validation::body_id_conflicts(&body, id) {
        return Err(AppError::IdMismatch);
    }

    let stored = state.films.get(id).await?.ok_or(AppError::NotFound)?;
    let fields = FilmFields { favorite, ..FilmFields::from(stored) };
    let film = state.films.update(id, fields).await?;
    film.map(Json).ok_or(AppError::NotFound)
}

// The existence/range check and the delta update are separate statements;
// a single writer is assumed.
pub async fn change_rating(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): JsonBody,
) -> AppResult<Json<Film>> {
    let (id, delta) = validation::rating_change_request(&body)?;

    let stored = state.films.get(id).await?.ok_or(AppError::NotFound)?;
    let Some(current) = stored.rating else {
        return Err(AppError::RatingNotSet);
    };
    if !(MIN_RATING..=MAX_RATING).contains(&(current + delta)) {
        return Err(AppError::RatingOutOfRange);
    }

    let film = state.films.adjust_rating(id, delta).await?;
    film.map(Json).ok_or(AppError::NotFound)
}

pub async fn delete_film(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<u64>> {
    let id = validation::film_id(&raw_id)?;
    let affected = state.films.delete(id).await?;
    Ok(Json(affected))
}
