use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::User;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password, role, branch, year, \
    college, purchased_course_ids, purchased_note_ids, course_progress, created_at";

/// Which entitlement array a purchase lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementKind {
    Course,
    Note,
}

/// Field set for a verified signup.
pub struct NewUser {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub college: Option<String>,
}

/// Finds a user by email.
pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(email.to_lowercase())
    .fetch_optional(db)
    .await?;

    Ok(user)
}

/// Finds a user by id.
pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

/// Creates the backing account record for a verified signup.
pub async fn create(db: &PgPool, new_user: NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users
            (id, first_name, last_name, email, password, role, branch, year, college,
             purchased_course_ids, purchased_note_ids, course_progress)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '{{}}', '{{}}', '{{}}'::jsonb)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.email.to_lowercase())
    .bind(new_user.password_hash)
    .bind(new_user.role)
    .bind(new_user.branch)
    .bind(new_user.year)
    .bind(new_user.college)
    .fetch_one(db)
    .await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Grants an entitlement. A single guarded array append, so granting the
/// same item twice records it once.
pub async fn grant_entitlement(
    db: &PgPool,
    user_id: Uuid,
    item_id: &str,
    kind: EntitlementKind,
) -> Result<()> {
    let column = match kind {
        EntitlementKind::Course => "purchased_course_ids",
        EntitlementKind::Note => "purchased_note_ids",
    };

    sqlx::query(&format!(
        "UPDATE users SET {column} = array_append({column}, $2) \
         WHERE id = $1 AND NOT ($2 = ANY({column}))"
    ))
    .bind(user_id)
    .bind(item_id)
    .execute(db)
    .await?;

    Ok(())
}

/// Adds a completed lesson into the progress map of `course_id`, set-like:
/// re-reporting an already-completed lesson is a no-op.
pub async fn add_progress(db: &PgPool, user_id: Uuid, course_id: &str, video_id: &str) -> Result<()> {
    let progress: Option<Json<HashMap<String, Vec<String>>>> =
        sqlx::query_scalar("SELECT course_progress FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

    let Some(Json(mut progress)) = progress else {
        return Ok(());
    };

    if !merge_progress(&mut progress, course_id, video_id) {
        return Ok(());
    }

    sqlx::query("UPDATE users SET course_progress = $2 WHERE id = $1")
        .bind(user_id)
        .bind(Json(progress))
        .execute(db)
        .await?;

    Ok(())
}

/// Inserts a completed lesson into a progress map. Returns whether the map
/// changed.
pub fn merge_progress(
    progress: &mut HashMap<String, Vec<String>>,
    course_id: &str,
    video_id: &str,
) -> bool {
    let completed = progress.entry(course_id.to_string()).or_default();
    if completed.iter().any(|v| v == video_id) {
        return false;
    }
    completed.push(video_id.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_a_lesson_twice_records_it_once() {
        let mut progress = HashMap::new();

        assert!(merge_progress(&mut progress, "c1", "v1"));
        assert!(!merge_progress(&mut progress, "c1", "v1"));

        assert_eq!(progress["c1"], vec!["v1".to_string()]);
    }

    #[test]
    fn progress_is_scoped_per_course() {
        let mut progress = HashMap::new();

        assert!(merge_progress(&mut progress, "c1", "v1"));
        assert!(merge_progress(&mut progress, "c2", "v1"));
        assert!(merge_progress(&mut progress, "c1", "v2"));

        assert_eq!(progress["c1"].len(), 2);
        assert_eq!(progress["c2"].len(), 1);
    }
}
