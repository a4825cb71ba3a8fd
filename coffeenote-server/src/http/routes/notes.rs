//! Note endpoints
//!
//! Each handler runs exactly one statement. Update and delete answer with
//! the same confirmation whether or not a row matched.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::{NoteBody, NoteId};
use crate::http::server::AppState;
use crate::models::{CreatedNote, MessageResponse, Note};

pub const NOT_FOUND_MESSAGE: &str = "Note not found";
pub const UPDATED_MESSAGE: &str = "Note updated successfully";
pub const DELETED_MESSAGE: &str = "Note deleted successfully";

/// POST /notes - create a note
async fn create_note(
    State(state): State<Arc<AppState>>,
    NoteBody(note): NoteBody,
) -> Result<(StatusCode, Json<CreatedNote>), ApiError> {
    let id = state.notes.create(&note).await?;
    tracing::debug!(id, "note created");

    Ok((StatusCode::CREATED, Json(CreatedNote { id, note })))
}

/// GET /notes - list every note
async fn list_notes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state.notes.list().await?;
    Ok(Json(notes))
}

/// GET /notes/{id} - get a single note
async fn get_note(
    State(state): State<Arc<AppState>>,
    NoteId(id): NoteId,
) -> Result<Json<Note>, ApiError> {
    let note = state
        .notes
        .get(&id)
        .await?
        .ok_or(ApiError::NotFound {
            message: NOT_FOUND_MESSAGE,
        })?;

    Ok(Json(note))
}

/// PUT /notes/{id} - overwrite all fields of a note
async fn update_note(
    State(state): State<Arc<AppState>>,
    NoteId(id): NoteId,
    NoteBody(note): NoteBody,
) -> Result<Json<MessageResponse>, ApiError> {
    let affected = state.notes.update(&id, &note).await?;
    tracing::debug!(%id, affected, "note updated");

    Ok(Json(MessageResponse::new(UPDATED_MESSAGE)))
}

/// DELETE /notes/{id} - delete a note
async fn delete_note(
    State(state): State<Arc<AppState>>,
    NoteId(id): NoteId,
) -> Result<Json<MessageResponse>, ApiError> {
    let affected = state.notes.delete(&id).await?;
    tracing::debug!(%id, affected, "note deleted");

    Ok(Json(MessageResponse::new(DELETED_MESSAGE)))
}

/// Note routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
}
