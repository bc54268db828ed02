use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A course: branch-scoped video content arranged as module -> video ->
/// resource. The nested structure is stored as one JSONB document per
/// course, so module and video edits are single-row updates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub branch_slug: String,
    pub year: String,
    pub description: Option<String>,
    pub price: i64,
    /// Storage key of the cover image, or an already-public URL.
    pub thumbnail: Option<String>,
    pub modules: Json<Vec<Module>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// A lesson. `video_url` is either a private storage key (streamed through
/// the range proxy) or an external URL used as-is.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// Legacy single-document field, superseded by `resources`.
    #[serde(default)]
    pub notes_url: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub is_free_preview: bool,
}

/// A secondary document attached to a lesson (PDF notes, slides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    /// Storage key or public URL.
    pub url: String,
    #[serde(rename = "type", default = "default_resource_kind")]
    pub kind: String,
}

fn default_resource_kind() -> String {
    "pdf".to_string()
}

impl Video {
    /// The lesson's documents in the new multi-resource shape. A legacy
    /// `notes_url` is folded into a single-entry list so callers never
    /// branch on the old field.
    pub fn documents(&self) -> Vec<Resource> {
        if !self.resources.is_empty() {
            return self.resources.clone();
        }
        match &self.notes_url {
            Some(url) => vec![Resource {
                title: "Notes".to_string(),
                url: url.clone(),
                kind: "pdf".to_string(),
            }],
            None => Vec::new(),
        }
    }
}

impl Course {
    /// Total lessons across all modules.
    pub fn video_count(&self) -> usize {
        self.modules.iter().map(|m| m.videos.len()).sum()
    }

    /// Total attached documents across all lessons, counting a legacy
    /// `notes_url` as one document.
    pub fn pdf_count(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| m.videos.iter())
            .map(|v| v.documents().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(resources: Vec<Resource>, notes_url: Option<&str>) -> Video {
        Video {
            id: "v1".to_string(),
            title: "Lesson".to_string(),
            resources,
            notes_url: notes_url.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn documents_prefers_resource_array() {
        let v = video(
            vec![Resource {
                title: "Slides".to_string(),
                url: "docs/slides.pdf".to_string(),
                kind: "pdf".to_string(),
            }],
            Some("docs/legacy.pdf"),
        );

        let docs = v.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "docs/slides.pdf");
    }

    #[test]
    fn documents_falls_back_to_legacy_notes_url() {
        let v = video(Vec::new(), Some("docs/legacy.pdf"));

        let docs = v.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "docs/legacy.pdf");
        assert_eq!(docs[0].title, "Notes");
    }

    #[test]
    fn counts_cover_modules_and_legacy_notes() {
        let course = Course {
            id: "c1".to_string(),
            title: "Thermodynamics".to_string(),
            branch_slug: "mechanical".to_string(),
            year: "2".to_string(),
            description: None,
            price: 499,
            thumbnail: None,
            modules: Json(vec![
                Module {
                    title: "Basics".to_string(),
                    videos: vec![video(Vec::new(), Some("docs/a.pdf")), video(Vec::new(), None)],
                },
                Module {
                    title: "Cycles".to_string(),
                    videos: vec![video(
                        vec![
                            Resource {
                                title: "Sheet".to_string(),
                                url: "docs/b.pdf".to_string(),
                                kind: "pdf".to_string(),
                            },
                            Resource {
                                title: "Answers".to_string(),
                                url: "docs/c.pdf".to_string(),
                                kind: "pdf".to_string(),
                            },
                        ],
                        None,
                    )],
                },
            ]),
            created_at: Utc::now(),
        };

        assert_eq!(course.video_count(), 3);
        assert_eq!(course.pdf_count(), 3);
    }
}
