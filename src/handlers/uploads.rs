use axum::{
    extract::{Multipart, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    state::AppState,
};

/// The query parameters for an upload: which key prefix the object lands
/// under (e.g. "videos", "thumbnails", "notes").
#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "uploads".to_string()
}

/// The response payload for a single upload.
#[derive(Serialize)]
pub struct UploadResponse {
    pub key: String,
}

/// The response payload for a batch upload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    pub uploaded_items: Vec<UploadedItem>,
}

#[derive(Serialize)]
pub struct UploadedItem {
    pub title: String,
    pub key: String,
}

/// Builds the storage key for an uploaded file: prefixed by folder,
/// timestamped against name collisions, whitespace flattened so the key is
/// URL-safe.
fn object_key(folder: &str, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    format!(
        "{}/{}-{}",
        folder.trim_matches('/'),
        chrono::Utc::now().timestamp_millis(),
        safe_name
    )
}

/// Uploads a single file into the private bucket. Admin-only.
#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Parse error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Multipart(format!("file data: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::Multipart("Empty file".to_string()));
        }

        let key = object_key(&query.folder, &file_name);
        state
            .storage
            .put(
                &key,
                content_type.as_deref().unwrap_or("application/octet-stream"),
                data,
            )
            .await?;

        tracing::info!("✅ Uploaded {} -> {}", file_name, key);
        return Ok(Json(UploadResponse { key }));
    }

    Err(AppError::Multipart("No file field in request".to_string()))
}

/// Uploads several files in one request. Admin-only. Field names become the
/// item titles, so a form can attach "Unit 1" -> unit1.pdf etc.
#[axum::debug_handler]
pub async fn upload_files(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut uploaded_items = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Parse error: {}", e)))?
    {
        let title = field.name().unwrap_or("Untitled").to_string();
        let file_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Multipart(format!("file data: {}", e)))?;

        if data.is_empty() {
            continue;
        }

        let key = object_key(&query.folder, &file_name);
        state
            .storage
            .put(
                &key,
                content_type.as_deref().unwrap_or("application/octet-stream"),
                data,
            )
            .await?;

        uploaded_items.push(UploadedItem { title, key });
    }

    if uploaded_items.is_empty() {
        return Err(AppError::Multipart("No files in request".to_string()));
    }

    tracing::info!("✅ Uploaded {} files", uploaded_items.len());
    Ok(Json(BatchUploadResponse { uploaded_items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_flatten_whitespace_and_keep_folder() {
        let key = object_key("videos", "intro lecture 1.mp4");

        assert!(key.starts_with("videos/"));
        assert!(key.ends_with("-intro-lecture-1.mp4"));
        assert!(!key.contains(' '));
    }

    #[test]
    fn folder_slashes_are_trimmed() {
        let key = object_key("/notes/", "a.pdf");
        assert!(key.starts_with("notes/"));
    }
}
