use std::collections::HashMap;

use serde::Deserialize;
use service_core::{
    axum::{
        extract::{Path, Query, State},
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        Json,
    },
    error::AppError,
    pagination::PageRequest,
    validation::FieldValidator,
};

use super::parse_id;
use crate::{
    middleware::CurrentIdentity,
    models::{Author, NewPuzzle, PublishedFilter, PuzzleData, PuzzlePatch, PuzzleSort},
    utils::StrictJson,
    AppState,
};

/// Optional precondition on PATCH: the version the client last saw.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreatePuzzleRequest {
    pub title: String,
    pub description: String,
    pub content: PuzzleData,
    pub width: i32,
    pub height: i32,
    pub published: bool,
}

pub async fn list_puzzles(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut v = FieldValidator::new();
    let page = PageRequest::parse(&params, state.config.pagination, PuzzleSort::DEFAULT, &mut v);
    let requested = PublishedFilter::parse(params.get("published").map(String::as_str), &mut v);
    v.into_result()?;

    // Only editors get to look past the published set.
    let filter = if state.can_edit_puzzles(&identity).await? {
        requested
    } else {
        PublishedFilter::Published
    };

    let page = state.store.list_puzzles(filter, &page).await?;

    Ok(Json(serde_json::json!({
        "puzzles": page.items,
        "metadata": page.metadata,
    })))
}

pub async fn show_puzzle(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&raw_id)?;
    let puzzle = state.store.get_puzzle(id).await?;

    if !puzzle.published && !state.can_edit_puzzles(&identity).await? {
        return Err(AppError::NotFound);
    }

    Ok(Json(serde_json::json!({ "puzzle": puzzle })))
}

pub async fn create_puzzle(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    StrictJson(input): StrictJson<CreatePuzzleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = identity.require_authenticated()?;

    let new_puzzle = NewPuzzle {
        title: input.title,
        description: input.description,
        content: input.content,
        width: input.width,
        height: input.height,
        published: input.published,
        author: Author::from(author),
    };

    let mut v = FieldValidator::new();
    new_puzzle.validate(&mut v);
    v.into_result()?;

    let puzzle = state.store.insert_puzzle(&new_puzzle).await?;
    tracing::info!(puzzle_id = puzzle.id, author_id = puzzle.author.id, "puzzle created");

    let location = format!("/v1/puzzles/{}", puzzle.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(serde_json::json!({ "puzzle": puzzle })),
    ))
}

pub async fn update_puzzle(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    StrictJson(patch): StrictJson<PuzzlePatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&raw_id)?;
    let expected = expected_version(&headers)?;

    let mut puzzle = state.store.get_puzzle(id).await?;
    if expected.is_some_and(|version| version != puzzle.version) {
        return Err(AppError::EditConflict);
    }

    patch.apply(&mut puzzle);

    let mut v = FieldValidator::new();
    puzzle.validate(&mut v);
    v.into_result()?;

    state.store.update_puzzle(&mut puzzle).await?;
    tracing::info!(puzzle_id = puzzle.id, version = puzzle.version, "puzzle updated");

    Ok(Json(serde_json::json!({ "puzzle": puzzle })))
}

pub async fn delete_puzzle(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&raw_id)?;
    state.store.delete_puzzle(id).await?;
    tracing::info!(puzzle_id = id, "puzzle deleted");

    Ok(Json(serde_json::json!({ "message": "puzzle successfully deleted" })))
}

fn expected_version(headers: &HeaderMap) -> Result<Option<i32>, AppError> {
    let Some(value) = headers.get(EXPECTED_VERSION_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| {
            AppError::BadRequest(format!("{} header must be an integer", EXPECTED_VERSION_HEADER))
        })
}
