use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::course::{Course, Module, Resource, Video},
    repositories::course as course_repo,
    repositories::user as user_repo,
    services::{catalog, signer},
    state::AppState,
};

/// The request payload for creating or updating a course.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCourseRequest {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub modules: Option<Vec<Module>>,
}

/// The request payload for adding a module to a course.
#[derive(Deserialize, Debug)]
pub struct AddModuleRequest {
    pub title: String,
}

/// The request payload for adding or updating a lesson.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub is_free_preview: bool,
}

impl VideoRequest {
    fn into_video(self) -> Video {
        Video {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: self.title,
            description: self.description,
            duration: self.duration,
            video_url: self.video_url,
            notes_url: None,
            resources: self.resources,
            is_free_preview: self.is_free_preview,
        }
    }
}

/// The request payload for reporting lesson completion.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub course_id: String,
    pub video_id: String,
}

/// A status-message response.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Lists all courses as storefront summaries.
#[axum::debug_handler]
pub async fn list_courses(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let courses = course_repo::list(&state.db).await?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in courses {
        summaries.push(catalog::summarize_course(&state.signer, course).await);
    }

    Ok(Json(summaries))
}

/// Returns one course with a display-ready thumbnail. Lesson video
/// references stay as raw keys: playback goes through the streaming proxy,
/// not through signed URLs.
#[axum::debug_handler]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    catalog::decorate_course(&state.signer, &mut course).await;

    Ok(Json(course))
}

/// Creates or updates a course. Admin-only.
///
/// Clients that edit a course echo back the decorated record, so a signed
/// thumbnail URL comes back where the raw key should be. A URL thumbnail is
/// dropped here and the stored key survives the round trip.
#[axum::debug_handler]
pub async fn upsert_course(
    State(state): State<AppState>,
    Json(payload): Json<UpsertCourseRequest>,
) -> Result<impl IntoResponse> {
    if payload.id.trim().is_empty() || payload.title.trim().is_empty() {
        return Err(AppError::Validation(
            "Course id and title are required".to_string(),
        ));
    }

    let thumbnail = payload.thumbnail.filter(|t| !signer::is_url(t));

    let course = course_repo::upsert(
        &state.db,
        course_repo::UpsertCourse {
            id: payload.id,
            title: payload.title,
            branch_slug: payload.branch_slug,
            year: payload.year,
            description: payload.description,
            price: payload.price,
            thumbnail,
            modules: payload.modules,
        },
    )
    .await?;

    tracing::info!("✅ Course saved: {}", course.id);
    Ok(Json(course))
}

/// Deletes a course and best-effort removes its private storage objects.
/// Admin-only.
#[axum::debug_handler]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    course_repo::delete(&state.db, &id).await?;

    for key in private_keys(&course) {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!("⚠️ Failed to delete object {}: {}", key, e);
        }
    }

    tracing::info!("🗑️ Course deleted: {}", id);
    Ok(Json(MessageResponse {
        message: "Course deleted".to_string(),
    }))
}

/// Every private storage key a course references, for cleanup on delete.
fn private_keys(course: &Course) -> Vec<String> {
    let mut keys = Vec::new();

    if let Some(thumbnail) = &course.thumbnail {
        if !signer::is_url(thumbnail) {
            keys.push(thumbnail.clone());
        }
    }

    for module in course.modules.iter() {
        for video in &module.videos {
            if let Some(url) = &video.video_url {
                if !signer::is_url(url) {
                    keys.push(url.clone());
                }
            }
            for doc in video.documents() {
                if !signer::is_url(&doc.url) {
                    keys.push(doc.url);
                }
            }
        }
    }

    keys
}

/// Appends an empty module to a course. Admin-only.
#[axum::debug_handler]
pub async fn add_module(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddModuleRequest>,
) -> Result<impl IntoResponse> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Module title is required".to_string()));
    }

    let mut course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    course.modules.push(Module {
        title: payload.title,
        videos: Vec::new(),
    });

    course_repo::save_modules(&state.db, &id, &course.modules).await?;

    Ok(Json(course))
}

/// Appends a lesson to a module. Admin-only.
#[axum::debug_handler]
pub async fn add_video(
    State(state): State<AppState>,
    Path((id, module_index)): Path<(String, usize)>,
    Json(payload): Json<VideoRequest>,
) -> Result<impl IntoResponse> {
    let mut course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let module = course
        .modules
        .get_mut(module_index)
        .ok_or(AppError::NotFound)?;

    module.videos.push(payload.into_video());

    course_repo::save_modules(&state.db, &id, &course.modules).await?;

    Ok(Json(course))
}

/// Replaces a lesson in place, keeping its id. Replaced private media keys
/// are best-effort deleted from storage. Admin-only.
#[axum::debug_handler]
pub async fn update_video(
    State(state): State<AppState>,
    Path((id, module_index, video_id)): Path<(String, usize, String)>,
    Json(payload): Json<VideoRequest>,
) -> Result<impl IntoResponse> {
    let mut course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let module = course
        .modules
        .get_mut(module_index)
        .ok_or(AppError::NotFound)?;

    let video = module
        .videos
        .iter_mut()
        .find(|v| v.id == video_id)
        .ok_or(AppError::NotFound)?;

    let mut updated = payload.into_video();
    updated.id = video.id.clone();

    let orphaned = orphaned_keys(video, &updated);
    *video = updated;

    course_repo::save_modules(&state.db, &id, &course.modules).await?;

    for key in orphaned {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!("⚠️ Failed to delete object {}: {}", key, e);
        }
    }

    Ok(Json(course))
}

/// Private keys the old lesson held that the new one no longer references.
fn orphaned_keys(old: &Video, new: &Video) -> Vec<String> {
    let mut retained: Vec<&str> = new.video_url.iter().map(String::as_str).collect();
    let new_docs = new.documents();
    retained.extend(new_docs.iter().map(|d| d.url.as_str()));

    let mut keys = Vec::new();
    if let Some(url) = &old.video_url {
        if !signer::is_url(url) && !retained.contains(&url.as_str()) {
            keys.push(url.clone());
        }
    }
    for doc in old.documents() {
        if !signer::is_url(&doc.url) && !retained.contains(&doc.url.as_str()) {
            keys.push(doc.url);
        }
    }
    keys
}

/// Removes a lesson and best-effort deletes its private media. Admin-only.
#[axum::debug_handler]
pub async fn delete_video(
    State(state): State<AppState>,
    Path((id, module_index, video_id)): Path<(String, usize, String)>,
) -> Result<impl IntoResponse> {
    let mut course = course_repo::find(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let module = course
        .modules
        .get_mut(module_index)
        .ok_or(AppError::NotFound)?;

    let position = module
        .videos
        .iter()
        .position(|v| v.id == video_id)
        .ok_or(AppError::NotFound)?;

    let removed = module.videos.remove(position);

    course_repo::save_modules(&state.db, &id, &course.modules).await?;

    let empty = Video::default();
    for key in orphaned_keys(&removed, &empty) {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!("⚠️ Failed to delete object {}: {}", key, e);
        }
    }

    Ok(Json(course))
}

/// Records lesson completion for the calling student. Marking the same
/// lesson twice is a no-op.
#[axum::debug_handler]
pub async fn mark_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ProgressRequest>,
) -> Result<impl IntoResponse> {
    if payload.course_id.trim().is_empty() || payload.video_id.trim().is_empty() {
        return Err(AppError::Validation(
            "courseId and videoId are required".to_string(),
        ));
    }

    user_repo::add_progress(&state.db, auth.id, &payload.course_id, &payload.video_id).await?;

    Ok(Json(MessageResponse {
        message: "Progress saved".to_string(),
    }))
}

/// Wipes the whole catalog (courses and notes). Admin-only, used by the
/// seeding tooling.
#[axum::debug_handler]
pub async fn reset_catalog(State(state): State<AppState>) -> Result<impl IntoResponse> {
    course_repo::reset_catalog(&state.db).await?;

    tracing::warn!("🗑️ Catalog reset");
    Ok(Json(MessageResponse {
        message: "Catalog reset".to_string(),
    }))
}
