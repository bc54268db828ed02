pub mod fake;
pub mod s3;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

pub use fake::InMemoryStore;
pub use s3::S3Store;

/// A streamed object body: chunks relayed without buffering the whole object.
pub type ObjectBody = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;

/// Metadata for a stored object, as returned by a HEAD request.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// The full size of the object in bytes.
    pub content_length: u64,
    /// The content type recorded at upload time, if any.
    pub content_type: Option<String>,
}

/// An object-storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested key does not exist in the bucket.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Any other backend failure (network, credentials, service error).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Interface to the private S3-compatible bucket holding video and PDF
/// binaries. Every call is an independent async I/O wait; implementations
/// hold no cross-request state.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch size and content type for a key.
    async fn head(&self, key: &str) -> Result<ObjectMeta, StorageError>;

    /// Fetch exactly the inclusive byte range `[start, end]` of an object.
    async fn get_range(&self, key: &str, start: u64, end: u64)
        -> Result<ObjectBody, StorageError>;

    /// Store an object under a key.
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Produce a time-limited URL granting single-object GET access.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
