use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::note::NoteFile,
    repositories::note as note_repo,
    services::{catalog, signer},
    state::AppState,
};

/// The request payload for creating or updating a note bundle.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpsertNoteRequest {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub coverage: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<NoteFile>>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Lists all note bundles with signed, normalized file lists.
#[axum::debug_handler]
pub async fn list_notes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let mut notes = note_repo::list(&state.db).await?;

    for note in &mut notes {
        catalog::decorate_note(&state.signer, note).await;
    }

    Ok(Json(notes))
}

/// Returns one note bundle, decorated for display.
#[axum::debug_handler]
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut note = note_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    catalog::decorate_note(&state.signer, &mut note).await;

    Ok(Json(note))
}

/// Creates or updates a note bundle. Admin-only.
///
/// Decorated records round-trip through edit forms, so signed URLs can come
/// back in `fileUrl` and `files`. URL entries in `fileUrl` are dropped
/// (stored key survives); the legacy field otherwise mirrors the first
/// file so old clients keep working.
#[axum::debug_handler]
pub async fn upsert_note(
    State(state): State<AppState>,
    Json(payload): Json<UpsertNoteRequest>,
) -> Result<impl IntoResponse> {
    if payload.id.trim().is_empty() || payload.title.trim().is_empty() {
        return Err(AppError::Validation(
            "Note id and title are required".to_string(),
        ));
    }

    let file_url = payload
        .file_url
        .filter(|url| !signer::is_url(url))
        .or_else(|| {
            payload
                .files
                .as_ref()
                .and_then(|files| files.first())
                .map(|f| f.url.clone())
                .filter(|url| !signer::is_url(url))
        });

    let note = note_repo::upsert(
        &state.db,
        note_repo::UpsertNote {
            id: payload.id,
            title: payload.title,
            branch_slug: payload.branch_slug,
            year: payload.year,
            subject: payload.subject,
            description: payload.description,
            price: payload.price,
            coverage: payload.coverage,
            file_url,
            files: payload.files,
        },
    )
    .await?;

    tracing::info!("✅ Note saved: {}", note.id);
    Ok(Json(note))
}

/// Deletes a note bundle, best-effort removing its stored files. Admin-only.
#[axum::debug_handler]
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let note = note_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    note_repo::delete(&state.db, &id).await?;

    for file in note.normalized_files() {
        if signer::is_url(&file.url) {
            continue;
        }
        if let Err(e) = state.storage.delete(&file.url).await {
            tracing::warn!("⚠️ Failed to delete object {}: {}", file.url, e);
        }
    }

    tracing::info!("🗑️ Note deleted: {}", id);
    Ok(Json(MessageResponse {
        message: "Note deleted".to_string(),
    }))
}
