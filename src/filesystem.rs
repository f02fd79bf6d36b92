//! Filesystem Adapter
//!
//! Emulates a hierarchical, directory-based filesystem on top of a flat
//! blob store. Directories are virtual: a path is a directory exactly when
//! some object key continues past it across a `/` boundary, so `mkdir` has
//! nothing to persist and subtree operations are synthesized from
//! prefix-scan plus per-object copy/delete.
//!
//! Multi-object operations (`rename`, `remove`) are not atomic. A failure
//! partway surfaces the underlying error and leaves the subtree mixed;
//! callers recover by re-listing.

use crate::config::LockConfig;
use crate::lock::DistributedLock;
use crate::path;
use crate::provider::{BlobError, BlobProvider, Lease, ObjectMeta};
use futures::future::try_join_all;
use metrics::counter;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Result of [`BlobFilesystem::stat`].
#[derive(Debug, Clone)]
pub struct Stat {
    is_dir: bool,
    meta: Option<ObjectMeta>,
}

impl Stat {
    /// Whether the path is treated as a directory.
    ///
    /// Virtual directories have no stored representation, so any path with
    /// no object at the exact key reports as a directory, including a
    /// wholly nonexistent one. Callers that need to distinguish the two
    /// must list the path.
    pub fn is_directory(&self) -> bool {
        self.is_dir
    }

    /// Object metadata; present only for plain files.
    pub fn metadata(&self) -> Option<&ObjectMeta> {
        self.meta.as_ref()
    }
}

/// Directory-emulating filesystem over a blob provider.
///
/// Every operation is independent; the adapter keeps no mutable state
/// across calls, so concurrent callers coordinate only through the store
/// itself and the optional lock.
pub struct BlobFilesystem<P> {
    provider: Arc<P>,
    lock: DistributedLock<P>,
}

impl<P: BlobProvider> BlobFilesystem<P> {
    pub fn new(provider: P, lock: LockConfig) -> Self {
        let provider = Arc::new(provider);
        let lock = DistributedLock::new(provider.clone(), lock);
        Self { provider, lock }
    }

    /// Ensure the backing container exists. Idempotent.
    pub async fn init(&self) -> Result<(), BlobError> {
        self.provider.ensure_container().await
    }

    /// List immediate children of `path`: the distinct first segments of
    /// every key at or under it. Objects deeper in a subdirectory collapse
    /// into that single child name; nothing recurses. An empty result means
    /// the path has no descendants.
    pub async fn read_dir(&self, p: &str) -> Result<Vec<String>, BlobError> {
        let parent = path::to_key(p);
        counter!("blobfs_operations_total", "op" => "read_dir").increment(1);
        let keys = self.provider.list(parent).await?;
        let mut children = BTreeSet::new();
        for key in keys {
            if !path::contains(parent, &key) {
                continue;
            }
            let rest = key[parent.len()..].trim_start_matches(path::SEP);
            if let Some(first) = rest.split(path::SEP).next() {
                if !first.is_empty() {
                    children.insert(first.to_string());
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    /// Full content of the object at `path`. Fails with
    /// [`BlobError::NotFound`] when no object exists at the exact key.
    pub async fn read_file(&self, p: &str) -> Result<Vec<u8>, BlobError> {
        self.provider.get(path::to_key(p)).await
    }

    /// Create or overwrite the object at `path` with `content`.
    pub async fn write_file(&self, p: &str, content: impl Into<Vec<u8>>) -> Result<(), BlobError> {
        counter!("blobfs_operations_total", "op" => "write_file").increment(1);
        self.provider.put(path::to_key(p), content.into()).await
    }

    /// Append `content` to the object at `path`, creating it if absent.
    ///
    /// Implemented as read-modify-write: the existing content is fetched,
    /// extended, and rewritten in full. Two concurrent appenders to the
    /// same key can therefore interleave and lose one update; callers that
    /// append concurrently must serialize through
    /// [`BlobFilesystem::lock`].
    pub async fn append_file(&self, p: &str, content: &[u8]) -> Result<(), BlobError> {
        let key = path::to_key(p);
        counter!("blobfs_operations_total", "op" => "append_file").increment(1);
        let mut data = match self.provider.get(key).await {
            Ok(existing) => existing,
            Err(BlobError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        data.extend_from_slice(content);
        self.provider.put(key, data).await
    }

    /// Rename the object at `old` and every object under it to the
    /// corresponding keys under `new`.
    ///
    /// All copies are issued and awaited before any original is deleted,
    /// but the operation is not atomic: a failure partway leaves
    /// already-copied objects under the new prefix and every original in
    /// place.
    pub async fn rename(&self, old: &str, new: &str) -> Result<(), BlobError> {
        let old_key = path::to_key(old);
        let new_key = path::to_key(new);
        counter!("blobfs_operations_total", "op" => "rename").increment(1);
        let keys = self.subtree_keys(old_key).await?;
        debug!(from = old_key, to = new_key, objects = keys.len(), "renaming subtree");
        try_join_all(keys.iter().map(|key| {
            let dst = format!("{}{}", new_key, &key[old_key.len()..]);
            async move { self.provider.copy(key, &dst).await }
        }))
        .await?;
        try_join_all(keys.iter().map(|key| self.provider.delete(key))).await?;
        Ok(())
    }

    /// Whether an object exists at exactly `path`. A path that is only a
    /// virtual directory prefix reports `false`.
    pub async fn exists(&self, p: &str) -> Result<bool, BlobError> {
        self.provider.exists(path::to_key(p)).await
    }

    /// Stat the path. See [`Stat::is_directory`] for the directory policy.
    pub async fn stat(&self, p: &str) -> Result<Stat, BlobError> {
        let key = path::to_key(p);
        if self.provider.exists(key).await? {
            let meta = self.provider.metadata(key).await?;
            Ok(Stat {
                is_dir: false,
                meta: Some(meta),
            })
        } else {
            Ok(Stat {
                is_dir: true,
                meta: None,
            })
        }
    }

    /// Directories are virtual; creating one is a no-op that always
    /// succeeds.
    pub async fn mkdir(&self, _p: &str) -> Result<(), BlobError> {
        Ok(())
    }

    /// Delete the object at `path` and, recursively, every object under
    /// it. Not atomic across multiple deletes.
    pub async fn remove(&self, p: &str) -> Result<(), BlobError> {
        let key = path::to_key(p);
        counter!("blobfs_operations_total", "op" => "remove").increment(1);
        let keys = self.subtree_keys(key).await?;
        debug!(path = key, objects = keys.len(), "removing subtree");
        try_join_all(keys.iter().map(|key| self.provider.delete(key))).await?;
        Ok(())
    }

    /// Server-side copy of a single object, leaving the source intact.
    pub async fn copy_file(&self, p: &str, new_p: &str) -> Result<(), BlobError> {
        counter!("blobfs_operations_total", "op" => "copy_file").increment(1);
        self.provider
            .copy(path::to_key(p), path::to_key(new_p))
            .await
    }

    /// Acquire the store-wide lock for a critical section spanning several
    /// adapter calls. Returns `None` when locking is disabled.
    pub async fn lock(&self) -> Result<Option<Lease>, BlobError> {
        self.lock.acquire().await
    }

    /// Release a lease obtained from [`BlobFilesystem::lock`]. Tolerates
    /// the lease having already been reclaimed by the store.
    pub async fn release_lock(&self, lease: Lease) -> Result<(), BlobError> {
        self.lock.release(lease).await
    }

    /// Keys at or under `key`, boundary-filtered.
    async fn subtree_keys(&self, key: &str) -> Result<Vec<String>, BlobError> {
        let keys = self.provider.list(key).await?;
        Ok(keys
            .into_iter()
            .filter(|k| path::contains(key, k))
            .collect())
    }
}

#[cfg(feature = "azure")]
impl BlobFilesystem<crate::provider::AzureProvider> {
    /// Construct the Azure-backed adapter from configuration; fails fast
    /// on missing credentials.
    pub fn from_config(config: &crate::config::StoreConfig) -> Result<Self, BlobError> {
        let provider = crate::provider::AzureProvider::from_config(config)?;
        Ok(Self::new(provider, config.lock.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    fn fs() -> BlobFilesystem<MemoryProvider> {
        BlobFilesystem::new(MemoryProvider::new(), LockConfig::default())
    }

    #[tokio::test]
    async fn append_creates_an_absent_object() {
        let fs = fs();
        fs.append_file("log", b"first").await.unwrap();
        assert_eq!(fs.read_file("log").await.unwrap(), b"first".to_vec());
    }

    #[tokio::test]
    async fn stat_conflates_nonexistent_with_directory() {
        let fs = fs();
        fs.write_file("dir/file", b"x").await.unwrap();

        assert!(!fs.stat("dir/file").await.unwrap().is_directory());
        assert!(fs.stat("dir").await.unwrap().is_directory());
        // A wholly nonexistent path is indistinguishable from a directory.
        assert!(fs.stat("nothing/here").await.unwrap().is_directory());
    }

    #[tokio::test]
    async fn leading_separator_addresses_the_same_object() {
        let fs = fs();
        fs.write_file("/a/b", b"data").await.unwrap();
        assert_eq!(fs.read_file("a/b").await.unwrap(), b"data".to_vec());
        assert!(fs.exists("/a/b").await.unwrap());
    }
}
