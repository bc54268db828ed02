//! In-memory `ObjectStore` used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::Mutex;

use crate::storage::{ObjectBody, ObjectMeta, ObjectStore, StorageError};

#[derive(Clone)]
struct StoredObject {
    content_type: String,
    data: Bytes,
}

/// An in-memory object store. Counts calls so tests can assert that a
/// rejected request never reached storage.
#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    presign_calls: AtomicUsize,
    fail_presign: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the trait.
    pub async fn insert(&self, key: &str, content_type: &str, data: Bytes) {
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
    }

    /// Make subsequent `presign_get` calls fail, simulating an unreachable
    /// signing backend.
    pub fn fail_presign(&self, fail: bool) {
        self.fail_presign.store(fail, Ordering::SeqCst);
    }

    /// Total number of storage calls observed (HEAD + ranged GET).
    pub fn storage_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst) + self.get_calls.load(Ordering::SeqCst)
    }

    pub fn presign_calls(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn head(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().await;
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(ObjectMeta {
            content_length: object.data.len() as u64,
            content_type: Some(object.content_type.clone()),
        })
    }

    async fn get_range(
        &self,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<ObjectBody, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().await;
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let len = object.data.len() as u64;
        if start >= len || end >= len || start > end {
            return Err(StorageError::Backend(format!(
                "invalid range {}-{} for object of {} bytes",
                start, end, len
            )));
        }

        let chunk = object.data.slice(start as usize..=end as usize);
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }

    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> Result<(), StorageError> {
        self.insert(key, content_type, body).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("signing backend unreachable".to_string()));
        }
        Ok(format!(
            "https://storage.test/{}?X-Amz-Expires={}",
            key,
            ttl.as_secs()
        ))
    }
}
