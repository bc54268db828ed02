use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::storage::ObjectStore;

/// Default validity for signed document URLs (1 hour).
pub const DOCUMENT_TTL: Duration = Duration::from_secs(3600);
/// Validity used by `/api/media/sign` (3 hours, so long videos and large
/// PDFs are not interrupted mid-view).
pub const MEDIA_TTL: Duration = Duration::from_secs(3 * 3600);

/// Whether a stored reference is already a public absolute URL, as opposed
/// to a private storage key. Signing and streaming both branch on this.
pub fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Converts private storage keys into time-limited retrieval URLs.
#[derive(Clone)]
pub struct KeySigner {
    store: Arc<dyn ObjectStore>,
}

impl KeySigner {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Signs a key for single-object GET access valid for exactly `ttl`.
    ///
    /// Already-public URLs (and empty references) pass through unchanged -
    /// a public resource is never wrapped, so signing is idempotent on its
    /// own output. A signing-backend failure is an error: the unsigned key
    /// is never handed out as a fallback.
    pub async fn sign(&self, key: &str, ttl: Duration) -> Result<String> {
        if key.is_empty() || is_url(key) {
            return Ok(key.to_string());
        }

        let url = self.store.presign_get(key, ttl).await?;
        Ok(url)
    }

    /// Signs a key for catalog decoration (thumbnails, note file lists).
    /// Here availability wins: on backend failure the raw key is kept and a
    /// warning logged, relying on the bucket itself to refuse unauthorized
    /// reads.
    pub async fn sign_or_keep(&self, key: &str, ttl: Duration) -> String {
        match self.sign(key, ttl).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Failed to sign key {}: {}", key, e);
                key.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::InMemoryStore;

    fn signer(store: Arc<InMemoryStore>) -> KeySigner {
        KeySigner::new(store)
    }

    #[tokio::test]
    async fn private_key_gets_a_time_limited_url() {
        let store = Arc::new(InMemoryStore::new());
        let s = signer(store.clone());

        let url = s.sign("videos/c1/lesson1.mp4", DOCUMENT_TTL).await.unwrap();

        assert!(url.starts_with("https://"));
        assert!(url.contains("videos/c1/lesson1.mp4"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert_eq!(store.presign_calls(), 1);
    }

    #[tokio::test]
    async fn absolute_url_passes_through_unsigned() {
        let store = Arc::new(InMemoryStore::new());
        let s = signer(store.clone());

        let public = "https://cdn.example.com/intro.mp4";
        assert_eq!(s.sign(public, DOCUMENT_TTL).await.unwrap(), public);
        // Idempotent passthrough: signing the output changes nothing.
        assert_eq!(s.sign(public, DOCUMENT_TTL).await.unwrap(), public);
        assert_eq!(store.presign_calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_fails_closed() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_presign(true);
        let s = signer(store);

        let err = s.sign("videos/v.mp4", DOCUMENT_TTL).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn decoration_keeps_raw_key_on_failure() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_presign(true);
        let s = signer(store);

        assert_eq!(s.sign_or_keep("thumbs/c1.jpg", DOCUMENT_TTL).await, "thumbs/c1.jpg");
    }
}
