use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::course::{Course, Module};

const COURSE_COLUMNS: &str =
    "id, title, branch_slug, year, description, price, thumbnail, modules, created_at";

/// Field set accepted by the admin upsert. `thumbnail` and `modules` are
/// optional: when absent the stored values are kept, so a metadata edit
/// cannot clobber content (and a signed URL echoed back by the client never
/// overwrites the stored key).
pub struct UpsertCourse {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    pub description: Option<String>,
    pub price: i64,
    pub thumbnail: Option<String>,
    pub modules: Option<Vec<Module>>,
}

/// Lists all courses, newest first.
pub async fn list(db: &PgPool) -> Result<Vec<Course>> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses ORDER BY created_at DESC",
        COURSE_COLUMNS
    ))
    .fetch_all(db)
    .await?;

    Ok(courses)
}

/// Finds a course by id.
pub async fn find(db: &PgPool, id: &str) -> Result<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE id = $1",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(course)
}

/// Creates or updates a course in one statement.
pub async fn upsert(db: &PgPool, course: UpsertCourse) -> Result<Course> {
    let updated = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (id, title, branch_slug, year, description, price, thumbnail, modules)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '[]'::jsonb))
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            branch_slug = EXCLUDED.branch_slug,
            year = EXCLUDED.year,
            description = EXCLUDED.description,
            price = EXCLUDED.price,
            thumbnail = COALESCE($7, courses.thumbnail),
            modules = COALESCE($8, courses.modules)
        RETURNING {}
        "#,
        COURSE_COLUMNS
    ))
    .bind(course.id)
    .bind(course.title)
    .bind(course.branch_slug)
    .bind(course.year)
    .bind(course.description)
    .bind(course.price)
    .bind(course.thumbnail)
    .bind(course.modules.map(Json))
    .fetch_one(db)
    .await?;

    Ok(updated)
}

/// Replaces a course's module tree (used by module/video sub-operations).
pub async fn save_modules(db: &PgPool, id: &str, modules: &[Module]) -> Result<()> {
    let result = sqlx::query("UPDATE courses SET modules = $2 WHERE id = $1")
        .bind(id)
        .bind(Json(modules))
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}

/// Deletes a course record.
pub async fn delete(db: &PgPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

/// Deletes every course and note (admin reset).
pub async fn reset_catalog(db: &PgPool) -> Result<()> {
    sqlx::query("DELETE FROM courses").execute(db).await?;
    sqlx::query("DELETE FROM notes").execute(db).await?;

    Ok(())
}
