//! Provider Trait Definitions
//!
//! The seam between the filesystem adapter and concrete blob stores.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by providers and the adapter built on them.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Lease conflict: {0}")]
    LeaseConflict(String),

    #[error("Lock acquisition failed after {attempts} attempts: {source}")]
    LockExhausted {
        attempts: u32,
        #[source]
        source: Box<BlobError>,
    },
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds)
    pub last_modified: i64,
    /// Content type/MIME type
    pub content_type: Option<String>,
    /// ETag or version identifier
    pub etag: Option<String>,
}

/// A store-issued exclusive-ownership token.
///
/// Advisory: a lease constrains only callers that coordinate through it.
/// Nothing stops an uncoordinated caller from mutating objects directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub id: String,
}

/// Abstraction over flat, prefix-addressable blob stores.
///
/// Keys are opaque strings with no enforced structure; the filesystem
/// adapter layers `/`-separated hierarchy semantics on top. All operations
/// suspend on network I/O and never block a worker thread.
#[async_trait]
pub trait BlobProvider: Send + Sync {
    /// Ensure the backing container exists, creating it if absent.
    /// Idempotent.
    async fn ensure_container(&self) -> Result<(), BlobError>;

    /// Fetch the full content of the object at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Create or overwrite the object at `key` with `content`.
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), BlobError>;

    /// Delete the object at `key`.
    async fn delete(&self, key: &str) -> Result<(), BlobError>;

    /// Server-side copy of a single object, leaving the source intact.
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), BlobError>;

    /// Whether an object exists at exactly `key`.
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;

    /// Metadata for the object at `key`.
    async fn metadata(&self, key: &str) -> Result<ObjectMeta, BlobError>;

    /// Every key starting with `prefix`, following the store's paging to
    /// exhaustion. Plain string-prefix matching; callers needing hierarchy
    /// boundaries filter the result themselves.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError>;

    /// Acquire the store-wide exclusive lease. Fails with
    /// [`BlobError::LeaseConflict`] while another live lease exists.
    async fn acquire_lease(&self, duration: Duration) -> Result<Lease, BlobError>;

    /// Release a held lease. Fails with [`BlobError::LeaseConflict`] when
    /// the store has already reclaimed it.
    async fn release_lease(&self, lease: &Lease) -> Result<(), BlobError>;
}
