use crate::error::{AppError, Result};
use crate::services::auth::{self};
use crate::storage::{ObjectBody, ObjectStore};

/// Content type relayed when storage recorded none at upload time.
const DEFAULT_VIDEO_TYPE: &str = "video/mp4";

/// A byte-range request against the streaming proxy. Re-derived from
/// scratch on every HTTP request: each range fetch from the browser's video
/// element is a fresh request and is authorized independently.
pub struct RangeQuery<'a> {
    /// The private storage key of the video object.
    pub key: &'a str,
    /// Session token from the query string - the playback element cannot
    /// attach headers, so the token travels in the URL.
    pub token: &'a str,
    /// The raw `Range` header, if present.
    pub range: Option<&'a str>,
}

/// A resolved partial-content response.
pub struct RangedObject {
    /// First byte served (inclusive).
    pub start: u64,
    /// Last byte served (inclusive).
    pub end: u64,
    /// Full object size.
    pub total: u64,
    pub content_type: String,
    pub body: ObjectBody,
}

impl std::fmt::Debug for RangedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedObject")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("total", &self.total)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl RangedObject {
    /// The `Content-Range` header value: `bytes start-end/total`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }

    /// The `Content-Length` header value: `end - start + 1`.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parses a single-range `Range` header (`bytes=start-end`) against a known
/// object size.
///
/// An omitted end means "serve to end of file". An end past the last byte
/// is clamped to it. Multiple ranges are unsupported by design - sequential
/// video playback only ever asks for one.
pub fn parse_range(header: &str, size: u64) -> Result<(u64, u64)> {
    let spec = header
        .strip_prefix("bytes=")
        .ok_or_else(|| AppError::Validation("Malformed Range header".to_string()))?;

    if spec.contains(',') {
        return Err(AppError::Validation(
            "Multiple ranges are not supported".to_string(),
        ));
    }

    let (start_s, end_s) = spec
        .split_once('-')
        .ok_or_else(|| AppError::Validation("Malformed Range header".to_string()))?;

    let start: u64 = start_s
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("Malformed Range header".to_string()))?;

    let end: u64 = match end_s.trim() {
        "" => size.saturating_sub(1),
        s => s
            .parse::<u64>()
            .map_err(|_| AppError::Validation("Malformed Range header".to_string()))?
            .min(size.saturating_sub(1)),
    };

    if size == 0 || start >= size || start > end {
        return Err(AppError::Validation(
            "Requested range not satisfiable".to_string(),
        ));
    }

    Ok((start, end))
}

/// Serves one authorized byte range of a private video object.
///
/// Pipeline per request: token check (403 before any storage call), Range
/// header check (400, storage never queried), metadata fetch (404 on a
/// missing object), range parse, partial fetch. The body is handed back as
/// a stream so the relay never buffers the whole object.
pub async fn serve_range(
    store: &dyn ObjectStore,
    secret: &str,
    query: RangeQuery<'_>,
) -> Result<RangedObject> {
    // Auth first. The failure is the same for bad and expired tokens and
    // does not reveal whether the object exists.
    if auth::verify_token(secret, query.token).is_err() {
        return Err(AppError::Unauthorized);
    }

    let range_header = query
        .range
        .ok_or_else(|| AppError::Validation("Range header required".to_string()))?;

    let meta = store.head(query.key).await?;
    let (start, end) = parse_range(range_header, meta.content_length)?;

    let body = store.get_range(query.key, start, end).await?;

    tracing::debug!(
        "📼 Relaying bytes {}-{}/{} of {}",
        start,
        end,
        meta.content_length,
        query.key
    );

    Ok(RangedObject {
        start,
        end,
        total: meta.content_length,
        content_type: meta.content_type.unwrap_or_else(|| DEFAULT_VIDEO_TYPE.to_string()),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::issue_token;
    use crate::storage::{InMemoryStore, StorageError};
    use bytes::Bytes;
    use futures::StreamExt;
    use uuid::Uuid;

    const SECRET: &str = "stream-test-secret-0123456789abcdef";
    const KEY: &str = "videos/c1/lesson1.mp4";

    async fn seeded_store(size: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        store.insert(KEY, "video/mp4", Bytes::from(data)).await;
        store
    }

    fn token() -> String {
        issue_token(SECRET, Uuid::new_v4(), "student", 7).unwrap()
    }

    async fn collect(body: ObjectBody) -> Vec<u8> {
        let chunks: Vec<_> = body.collect().await;
        chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect()
    }

    #[tokio::test]
    async fn open_ended_range_serves_to_end_of_file() {
        let store = seeded_store(1_000_000).await;
        let token = token();

        let ranged = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: KEY,
                token: &token,
                range: Some("bytes=500000-"),
            },
        )
        .await
        .unwrap();

        assert_eq!(ranged.start, 500_000);
        assert_eq!(ranged.end, 999_999);
        assert_eq!(ranged.total, 1_000_000);
        assert_eq!(ranged.content_length(), 500_000);
        assert_eq!(ranged.content_range(), "bytes 500000-999999/1000000");
        assert_eq!(ranged.content_type, "video/mp4");

        let body = collect(ranged.body).await;
        assert_eq!(body.len(), 500_000);
        assert_eq!(body[0], (500_000 % 251) as u8);
    }

    #[tokio::test]
    async fn bounded_range_relays_exact_slice() {
        let store = seeded_store(4096).await;
        let token = token();

        let ranged = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: KEY,
                token: &token,
                range: Some("bytes=100-199"),
            },
        )
        .await
        .unwrap();

        assert_eq!(ranged.content_length(), 100);
        assert_eq!(ranged.content_range(), "bytes 100-199/4096");

        let body = collect(ranged.body).await;
        assert_eq!(body.len(), 100);
        assert_eq!(body[0], 100 % 251);
        assert_eq!(body[99], 199 % 251);
    }

    #[tokio::test]
    async fn missing_range_header_is_rejected_before_storage() {
        let store = seeded_store(4096).await;
        let token = token();

        let err = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: KEY,
                token: &token,
                range: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.storage_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_before_storage() {
        let store = seeded_store(4096).await;

        let err = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: KEY,
                token: "not.a.token",
                range: Some("bytes=0-"),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(store.storage_calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_storage() {
        let store = seeded_store(4096).await;
        let stale = issue_token(SECRET, Uuid::new_v4(), "student", -2).unwrap();

        let err = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: KEY,
                token: &stale,
                range: Some("bytes=0-"),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(store.storage_calls(), 0);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryStore::new();
        let token = token();

        let err = serve_range(
            &store,
            SECRET,
            RangeQuery {
                key: "videos/ghost.mp4",
                token: &token,
                range: Some("bytes=0-"),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Storage(StorageError::NotFound(_))));
    }

    #[test]
    fn range_parser_accepts_exact_bounds() {
        assert_eq!(parse_range("bytes=0-4095", 4096).unwrap(), (0, 4095));
        assert_eq!(parse_range("bytes=0-", 4096).unwrap(), (0, 4095));
        assert_eq!(parse_range("bytes=4095-", 4096).unwrap(), (4095, 4095));
    }

    #[test]
    fn range_parser_clamps_overshooting_end() {
        assert_eq!(parse_range("bytes=100-999999", 4096).unwrap(), (100, 4095));
    }

    #[test]
    fn range_parser_rejects_malformed_input() {
        for header in [
            "0-100",
            "bytes=abc-",
            "bytes=",
            "bytes=100",
            "bytes=-500",
            "bytes=0-100,200-300",
            "bytes=200-100",
            "bytes=4096-",
        ] {
            assert!(
                matches!(parse_range(header, 4096), Err(AppError::Validation(_))),
                "expected rejection for {:?}",
                header
            );
        }
    }

    #[test]
    fn range_parser_rejects_empty_object() {
        assert!(matches!(parse_range("bytes=0-", 0), Err(AppError::Validation(_))));
    }
}
