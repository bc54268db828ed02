use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

/// A student or admin account.
///
/// Entitlements live directly on the account as id arrays, and per-course
/// progress is a map of course id to the list of completed lesson ids.
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    /// Argon2id hash, not the plaintext.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub college: Option<String>,
    pub purchased_course_ids: Vec<String>,
    pub purchased_note_ids: Vec<String>,
    pub course_progress: Json<HashMap<String, Vec<String>>>,
    pub created_at: DateTime<Utc>,
}

/// The role given to ordinary signups.
pub const ROLE_STUDENT: &str = "student";
/// The back-office role.
pub const ROLE_ADMIN: &str = "admin";
