use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A purchasable PDF note bundle. Older records carry a single `file_url`;
/// newer records carry a `files` array. Readers normalize through
/// [`Note::normalized_files`] instead of branching on the legacy field.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub coverage: Option<String>,
    /// Legacy single-file field.
    pub file_url: Option<String>,
    pub files: Json<Vec<NoteFile>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteFile {
    pub title: String,
    /// Storage key or public URL.
    pub url: String,
}

impl Note {
    /// The bundle's files in the multi-file shape, folding a legacy
    /// `file_url` into a single entry when the array is empty.
    pub fn normalized_files(&self) -> Vec<NoteFile> {
        if !self.files.is_empty() {
            return self.files.0.clone();
        }
        match &self.file_url {
            Some(url) => vec![NoteFile {
                title: "Main Notes".to_string(),
                url: url.clone(),
            }],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(file_url: Option<&str>, files: Vec<NoteFile>) -> Note {
        Note {
            id: "n1".to_string(),
            title: "Signals".to_string(),
            branch_slug: "ece".to_string(),
            year: "3".to_string(),
            subject: None,
            description: None,
            price: 99,
            coverage: None,
            file_url: file_url.map(|s| s.to_string()),
            files: Json(files),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_single_file_becomes_main_notes_entry() {
        let n = note(Some("notes/signals.pdf"), Vec::new());

        let files = n.normalized_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].title, "Main Notes");
        assert_eq!(files[0].url, "notes/signals.pdf");
    }

    #[test]
    fn multi_file_shape_wins_over_legacy_field() {
        let n = note(
            Some("notes/old.pdf"),
            vec![
                NoteFile {
                    title: "Unit 1".to_string(),
                    url: "notes/u1.pdf".to_string(),
                },
                NoteFile {
                    title: "Unit 2".to_string(),
                    url: "notes/u2.pdf".to_string(),
                },
            ],
        );

        let files = n.normalized_files();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.url.starts_with("notes/u")));
    }

    #[test]
    fn empty_note_has_no_files() {
        assert!(note(None, Vec::new()).normalized_files().is_empty());
    }
}
