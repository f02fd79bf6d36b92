//! Azure Blob Storage Provider
//!
//! Objects live as block blobs in a single container; the store-wide lease
//! is a container-level lease, so one lock guards the whole store.

use super::traits::{BlobError, BlobProvider, Lease, ObjectMeta};
use crate::config::StoreConfig;
use async_trait::async_trait;
use azure_core::request_options::LeaseId;
use azure_core::StatusCode;
use azure_storage::StorageCredentials;
use azure_storage_blobs::prelude::*;
use futures::StreamExt;
use std::time::Duration;
use tracing::info;

/// Azure Blob Storage provider.
#[derive(Clone)]
pub struct AzureProvider {
    container: ContainerClient,
}

impl AzureProvider {
    pub fn new(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        let account = account.into();
        let credentials = StorageCredentials::access_key(&account, access_key.into());
        let container =
            BlobServiceClient::new(&account, credentials).container_client(container.into());
        Self { container }
    }

    /// Construct from adapter configuration; fails fast on missing
    /// credentials, before any store round trip.
    pub fn from_config(config: &StoreConfig) -> Result<Self, BlobError> {
        config.validate()?;
        Ok(Self::new(
            &config.account_name,
            &config.account_key,
            &config.container,
        ))
    }

    pub fn from_env(container: impl Into<String>) -> Result<Self, BlobError> {
        let account = std::env::var("AZURE_STORAGE_ACCOUNT")
            .map_err(|_| BlobError::Configuration("AZURE_STORAGE_ACCOUNT not set".into()))?;
        let key = std::env::var("AZURE_STORAGE_KEY")
            .map_err(|_| BlobError::Configuration("AZURE_STORAGE_KEY not set".into()))?;
        Ok(Self::new(account, key, container))
    }

    fn blob_client(&self, key: &str) -> BlobClient {
        self.container.blob_client(key)
    }
}

/// Map a service error onto the crate's error kinds. 404s become
/// `NotFound` for `target`; lease-related 409s become `LeaseConflict`.
fn map_azure_err(err: azure_core::error::Error, target: &str) -> BlobError {
    if let Some(http) = err.as_http_error() {
        match http.status() {
            StatusCode::NotFound => return BlobError::NotFound(target.to_string()),
            StatusCode::Conflict => {
                if let Some(code) = http.error_code() {
                    if code.starts_with("Lease") {
                        return BlobError::LeaseConflict(code.to_string());
                    }
                }
            }
            _ => {}
        }
        return BlobError::Provider(err.to_string());
    }
    BlobError::Network(err.to_string())
}

#[async_trait]
impl BlobProvider for AzureProvider {
    async fn ensure_container(&self) -> Result<(), BlobError> {
        match self.container.create().await {
            Ok(_) => {
                info!(container = %self.container.container_name(), "created container");
                Ok(())
            }
            Err(e) => {
                let already_exists = e
                    .as_http_error()
                    .and_then(|http| http.error_code())
                    .is_some_and(|code| code == "ContainerAlreadyExists");
                if already_exists {
                    Ok(())
                } else {
                    Err(map_azure_err(e, self.container.container_name()))
                }
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.blob_client(key)
            .get_content()
            .await
            .map_err(|e| map_azure_err(e, key))
    }

    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), BlobError> {
        self.blob_client(key)
            .put_block_blob(content)
            .await
            .map(|_| ())
            .map_err(|e| map_azure_err(e, key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.blob_client(key)
            .delete()
            .await
            .map(|_| ())
            .map_err(|e| map_azure_err(e, key))
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), BlobError> {
        let source_url = self
            .blob_client(src_key)
            .url()
            .map_err(|e| BlobError::Provider(e.to_string()))?;
        self.blob_client(dst_key)
            .copy(source_url)
            .await
            .map(|_| ())
            .map_err(|e| map_azure_err(e, src_key))
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        self.blob_client(key)
            .exists()
            .await
            .map_err(|e| map_azure_err(e, key))
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMeta, BlobError> {
        let props = self
            .blob_client(key)
            .get_properties()
            .await
            .map_err(|e| map_azure_err(e, key))?;
        Ok(ObjectMeta {
            size: props.blob.properties.content_length,
            last_modified: props.blob.properties.last_modified.unix_timestamp(),
            content_type: Some(props.blob.properties.content_type.to_string()),
            etag: Some(props.blob.properties.etag.to_string()),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        let mut keys = Vec::new();
        let mut builder = self.container.list_blobs();
        if !prefix.is_empty() {
            builder = builder.prefix(prefix.to_string());
        }
        let mut pages = builder.into_stream();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_azure_err(e, prefix))?;
            for blob in page.blobs.blobs() {
                keys.push(blob.name.clone());
            }
        }
        Ok(keys)
    }

    async fn acquire_lease(&self, duration: Duration) -> Result<Lease, BlobError> {
        let response = self
            .container
            .acquire_lease(duration)
            .await
            .map_err(|e| map_azure_err(e, self.container.container_name()))?;
        Ok(Lease {
            id: response.lease_id.to_string(),
        })
    }

    async fn release_lease(&self, lease: &Lease) -> Result<(), BlobError> {
        let lease_id: LeaseId = lease
            .id
            .parse()
            .map_err(|_| BlobError::Provider(format!("malformed lease id: {}", lease.id)))?;
        self.container
            .container_lease_client(lease_id)
            .release()
            .await
            .map(|_| ())
            .map_err(|e| map_azure_err(e, self.container.container_name()))
    }
}
