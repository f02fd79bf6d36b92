//! In-Memory Blob Provider
//!
//! A flat key map behind a mutex, plus a single lease slot with wall-clock
//! expiry. Useful for development, testing, and exercising the adapter's
//! directory emulation without a cloud account.

use super::traits::{BlobError, BlobProvider, Lease, ObjectMeta};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    last_modified: i64,
    etag: String,
}

impl StoredObject {
    fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            last_modified: chrono::Utc::now().timestamp(),
            etag: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug)]
struct LeaseSlot {
    id: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    objects: Mutex<HashMap<String, StoredObject>>,
    lease: Mutex<Option<LeaseSlot>>,
}

/// In-memory blob store. Cloning shares the underlying state, so clones
/// model independent callers hitting the same container.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<Inner>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects. Test helper.
    pub fn len(&self) -> usize {
        self.inner.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobProvider for MemoryProvider {
    async fn ensure_container(&self) -> Result<(), BlobError> {
        // The map is the container; nothing to provision.
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let objects = self.inner.objects.lock().unwrap();
        objects
            .get(key)
            .map(|o| o.content.clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), BlobError> {
        let mut objects = self.inner.objects.lock().unwrap();
        objects.insert(key.to_string(), StoredObject::new(content));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let mut objects = self.inner.objects.lock().unwrap();
        if objects.remove(key).is_none() {
            return Err(BlobError::NotFound(key.to_string()));
        }
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), BlobError> {
        let mut objects = self.inner.objects.lock().unwrap();
        let content = objects
            .get(src_key)
            .map(|o| o.content.clone())
            .ok_or_else(|| BlobError::NotFound(src_key.to_string()))?;
        objects.insert(dst_key.to_string(), StoredObject::new(content));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.inner.objects.lock().unwrap().contains_key(key))
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMeta, BlobError> {
        let objects = self.inner.objects.lock().unwrap();
        objects
            .get(key)
            .map(|o| ObjectMeta {
                size: o.content.len() as u64,
                last_modified: o.last_modified,
                content_type: None,
                etag: Some(o.etag.clone()),
            })
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        let objects = self.inner.objects.lock().unwrap();
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn acquire_lease(&self, duration: Duration) -> Result<Lease, BlobError> {
        let mut slot = self.inner.lease.lock().unwrap();
        if let Some(held) = slot.as_ref() {
            if Instant::now() < held.expires_at {
                return Err(BlobError::LeaseConflict(
                    "lease already present".to_string(),
                ));
            }
        }
        let id = Uuid::new_v4().to_string();
        *slot = Some(LeaseSlot {
            id: id.clone(),
            expires_at: Instant::now() + duration,
        });
        Ok(Lease { id })
    }

    async fn release_lease(&self, lease: &Lease) -> Result<(), BlobError> {
        let mut slot = self.inner.lease.lock().unwrap();
        match slot.as_ref() {
            Some(held) if held.id == lease.id => {
                *slot = None;
                Ok(())
            }
            _ => Err(BlobError::LeaseConflict(
                "lease expired or reacquired by another caller".to_string(),
            )),
        }
    }
}
