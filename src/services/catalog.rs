use serde::Serialize;
use sqlx::types::Json;

use crate::models::course::Course;
use crate::models::note::Note;
use crate::services::signer::{KeySigner, DOCUMENT_TTL};

/// A course as returned by the list endpoint: the record plus aggregate
/// counts the storefront shows on cards.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub video_count: usize,
    pub pdf_count: usize,
}

/// Signs a course's thumbnail for client display. Thumbnails are
/// decoration, so a signing failure keeps the raw key rather than failing
/// the listing.
pub async fn decorate_course(signer: &KeySigner, course: &mut Course) {
    if let Some(thumbnail) = course.thumbnail.take() {
        course.thumbnail = Some(signer.sign_or_keep(&thumbnail, DOCUMENT_TTL).await);
    }
}

/// Builds the list-view shape for a course: signed thumbnail + counts.
pub async fn summarize_course(signer: &KeySigner, mut course: Course) -> CourseSummary {
    let video_count = course.video_count();
    let pdf_count = course.pdf_count();
    decorate_course(signer, &mut course).await;

    CourseSummary {
        course,
        video_count,
        pdf_count,
    }
}

/// Normalizes a note into the multi-file shape and signs every file for
/// immediate access on the detail view. The legacy `file_url` is signed too
/// where present (deprecated but still consumed by old clients).
pub async fn decorate_note(signer: &KeySigner, note: &mut Note) {
    let mut files = note.normalized_files();
    for file in &mut files {
        file.url = signer.sign_or_keep(&file.url, DOCUMENT_TTL).await;
    }
    note.files = Json(files);

    if let Some(file_url) = note.file_url.take() {
        note.file_url = Some(signer.sign_or_keep(&file_url, DOCUMENT_TTL).await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::note::NoteFile;
    use chrono::Utc;
    use std::sync::Arc;

    use crate::storage::InMemoryStore;

    fn signer() -> KeySigner {
        KeySigner::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn note_decoration_normalizes_and_signs_legacy_shape() {
        let mut note = Note {
            id: "n1".to_string(),
            title: "Maths".to_string(),
            branch_slug: "cse".to_string(),
            year: "1".to_string(),
            subject: None,
            description: None,
            price: 49,
            coverage: None,
            file_url: Some("notes/maths.pdf".to_string()),
            files: Json(Vec::new()),
            created_at: Utc::now(),
        };

        decorate_note(&signer(), &mut note).await;

        assert_eq!(note.files.len(), 1);
        assert!(note.files[0].url.starts_with("https://"));
        assert_eq!(note.files[0].title, "Main Notes");
        assert!(note.file_url.unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn note_decoration_leaves_public_urls_alone() {
        let mut note = Note {
            id: "n2".to_string(),
            title: "Physics".to_string(),
            branch_slug: "cse".to_string(),
            year: "1".to_string(),
            subject: None,
            description: None,
            price: 0,
            coverage: None,
            file_url: None,
            files: Json(vec![NoteFile {
                title: "Open PDF".to_string(),
                url: "https://example.com/open.pdf".to_string(),
            }]),
            created_at: Utc::now(),
        };

        decorate_note(&signer(), &mut note).await;

        assert_eq!(note.files[0].url, "https://example.com/open.pdf");
    }
}
