//! Distributed Lock
//!
//! Store-wide mutual exclusion built on a provider-issued lease. Acquisition
//! fails immediately while another live lease exists, so it is driven
//! through [`RetryPolicy`] with linear backoff; the attempt budget should be
//! large relative to expected contention, since exhaustion is the only
//! signal of it.
//!
//! The lease is advisory. It serializes callers that lock around their
//! critical sections; it does not stop anyone from mutating objects
//! directly. An unreleased lease is reclaimed by the store after the
//! configured duration, so critical sections must stay short relative to
//! it.

use crate::config::LockConfig;
use crate::provider::{BlobError, BlobProvider, Lease};
use crate::retry::RetryPolicy;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct DistributedLock<P> {
    provider: Arc<P>,
    config: LockConfig,
    policy: RetryPolicy,
}

impl<P: BlobProvider> DistributedLock<P> {
    pub fn new(provider: Arc<P>, config: LockConfig) -> Self {
        let policy = RetryPolicy::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        );
        Self {
            provider,
            config,
            policy,
        }
    }

    /// Acquire the store-wide lease, retrying while it is held elsewhere.
    ///
    /// Returns `Ok(None)` when locking is disabled. Exhausting the attempt
    /// budget surfaces [`BlobError::LockExhausted`] carrying the last
    /// provider error; callers must treat it as a hard failure, not retry
    /// further.
    pub async fn acquire(&self) -> Result<Option<Lease>, BlobError> {
        if !self.config.enabled {
            return Ok(None);
        }
        counter!("blobfs_lock_acquisitions_total").increment(1);
        let duration = Duration::from_secs(self.config.lease_duration_secs);
        match self
            .policy
            .run(|| self.provider.acquire_lease(duration))
            .await
        {
            Ok(lease) => Ok(Some(lease)),
            Err(source) => {
                counter!("blobfs_lock_exhaustions_total").increment(1);
                Err(BlobError::LockExhausted {
                    attempts: self.policy.max_attempts(),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Release a held lease.
    ///
    /// A lease the store has already reclaimed (it expired and may have been
    /// reacquired in the interim) is an expected race, logged and not
    /// surfaced. Every other failure propagates.
    pub async fn release(&self, lease: Lease) -> Result<(), BlobError> {
        if !self.config.enabled {
            return Ok(());
        }
        match self.provider.release_lease(&lease).await {
            Ok(()) => Ok(()),
            Err(BlobError::LeaseConflict(reason)) => {
                warn!(lease_id = %lease.id, %reason, "lease already reclaimed; ignoring release failure");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    fn quick_lock(provider: &MemoryProvider, attempts: u32) -> DistributedLock<MemoryProvider> {
        DistributedLock::new(
            Arc::new(provider.clone()),
            LockConfig {
                retry_attempts: attempts,
                retry_delay_ms: 1,
                ..LockConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn contended_acquisition_exhausts_and_surfaces() {
        let provider = MemoryProvider::new();
        let holder = quick_lock(&provider, 3);
        let contender = quick_lock(&provider, 3);

        let lease = holder.acquire().await.unwrap().unwrap();
        let err = contender.acquire().await.unwrap_err();
        assert!(matches!(
            err,
            BlobError::LockExhausted { attempts: 3, .. }
        ));

        holder.release(lease).await.unwrap();
        let lease = contender.acquire().await.unwrap().unwrap();
        contender.release(lease).await.unwrap();
    }

    #[tokio::test]
    async fn releasing_a_reclaimed_lease_is_swallowed() {
        let provider = MemoryProvider::new();
        let lock = quick_lock(&provider, 3);

        let stale = Lease {
            id: "no-longer-held".to_string(),
        };
        lock.release(stale).await.unwrap();
    }

    #[tokio::test]
    async fn disabled_lock_is_a_no_op() {
        let provider = MemoryProvider::new();
        let lock = DistributedLock::new(Arc::new(provider), LockConfig::disabled());
        assert!(lock.acquire().await.unwrap().is_none());
    }
}
