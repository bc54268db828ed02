use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::note::{Note, NoteFile};

const NOTE_COLUMNS: &str =
    "id, title, branch_slug, year, subject, description, price, coverage, file_url, files, created_at";

/// Field set accepted by the admin upsert. Like courses, absent `file_url`
/// or `files` keep the stored values.
pub struct UpsertNote {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub coverage: Option<String>,
    pub file_url: Option<String>,
    pub files: Option<Vec<NoteFile>>,
}

/// Lists all note bundles, newest first.
pub async fn list(db: &PgPool) -> Result<Vec<Note>> {
    let notes = sqlx::query_as::<_, Note>(&format!(
        "SELECT {} FROM notes ORDER BY created_at DESC",
        NOTE_COLUMNS
    ))
    .fetch_all(db)
    .await?;

    Ok(notes)
}

/// Finds a note bundle by id.
pub async fn find(db: &PgPool, id: &str) -> Result<Option<Note>> {
    let note = sqlx::query_as::<_, Note>(&format!(
        "SELECT {} FROM notes WHERE id = $1",
        NOTE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(note)
}

/// Creates or updates a note bundle in one statement.
pub async fn upsert(db: &PgPool, note: UpsertNote) -> Result<Note> {
    let updated = sqlx::query_as::<_, Note>(&format!(
        r#"
        INSERT INTO notes
            (id, title, branch_slug, year, subject, description, price, coverage, file_url, files)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, '[]'::jsonb))
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            branch_slug = EXCLUDED.branch_slug,
            year = EXCLUDED.year,
            subject = EXCLUDED.subject,
            description = EXCLUDED.description,
            price = EXCLUDED.price,
            coverage = EXCLUDED.coverage,
            file_url = COALESCE($9, notes.file_url),
            files = COALESCE($10, notes.files)
        RETURNING {}
        "#,
        NOTE_COLUMNS
    ))
    .bind(note.id)
    .bind(note.title)
    .bind(note.branch_slug)
    .bind(note.year)
    .bind(note.subject)
    .bind(note.description)
    .bind(note.price)
    .bind(note.coverage)
    .bind(note.file_url)
    .bind(note.files.map(Json))
    .fetch_one(db)
    .await?;

    Ok(updated)
}

/// Deletes a note record.
pub async fn delete(db: &PgPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}
