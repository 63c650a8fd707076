//! Background sync: deferred client actions replayed on reconnect.
//!
//! The worker owns only the tag→handler association. Handler business
//! logic (resubmitting a queued contact form, refreshing content) belongs
//! to the subsystems that register them.

use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use lumen_common::{retry_with_backoff, RetryConfig};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Capabilities;
use crate::WorkerError;

/// Tag for queued contact/order form submissions.
pub const CONTACT_FORM_TAG: &str = "contact-form-sync";

/// Tag for periodic content refresh.
pub const CONTENT_REFRESH_TAG: &str = "content-refresh";

/// A deferred action replayed when connectivity returns.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Flush the queued work this handler owns.
    async fn replay(&self) -> Result<(), WorkerError>;
}

/// Tag→handler registry for one-shot and periodic sync.
pub struct SyncManager {
    capabilities: Capabilities,
    handlers: RwLock<HashMap<String, Arc<dyn SyncHandler>>>,
    periodic: RwLock<HashMap<String, Arc<dyn SyncHandler>>>,
}

impl SyncManager {
    /// Capabilities are negotiated once, at construction.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            handlers: RwLock::new(HashMap::new()),
            periodic: RwLock::new(HashMap::new()),
        }
    }

    /// Register the handler for a one-shot sync tag.
    pub async fn register(&self, tag: &str, handler: Arc<dyn SyncHandler>) {
        debug!(tag, "Registered sync handler");
        self.handlers.write().await.insert(tag.to_string(), handler);
    }

    /// Register the handler for a periodic sync tag. Refused when the
    /// host cannot deliver periodic sync events.
    pub async fn register_periodic(
        &self,
        tag: &str,
        handler: Arc<dyn SyncHandler>,
    ) -> Result<(), WorkerError> {
        if !self.capabilities.periodic_sync {
            warn!(tag, "Periodic sync unavailable on this host");
            return Err(WorkerError::PeriodicSyncUnsupported);
        }
        debug!(tag, "Registered periodic sync handler");
        self.periodic.write().await.insert(tag.to_string(), handler);
        Ok(())
    }

    /// Replay the handler for a fired sync tag, with backoff: the
    /// connection just returned and may still be flapping.
    pub async fn dispatch(&self, tag: &str) -> Result<(), WorkerError> {
        let handler = self
            .handlers
            .read()
            .await
            .get(tag)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownSyncTag(tag.to_string()))?;

        info!(tag, "Replaying deferred sync work");
        retry_with_backoff(&RetryConfig::sync_replay(), || handler.replay()).await
    }

    /// Run the handler for a fired periodic sync tag. Best-effort, one
    /// attempt; the next period will come around regardless.
    pub async fn dispatch_periodic(&self, tag: &str) -> Result<(), WorkerError> {
        let handler = self
            .periodic
            .read()
            .await
            .get(tag)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownSyncTag(tag.to_string()))?;

        debug!(tag, "Running periodic sync");
        handler.replay().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` attempts, then succeeds.
    struct FlakyHandler {
        attempts: AtomicU32,
        failures: u32,
    }

    impl FlakyHandler {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                attempts: AtomicU32::new(0),
                failures,
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncHandler for FlakyHandler {
        async fn replay(&self) -> Result<(), WorkerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                Err(WorkerError::SyncReplay("connection still flapping".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handler() {
        let manager = SyncManager::new(Capabilities::default());
        let handler = FlakyHandler::new(0);
        manager.register(CONTACT_FORM_TAG, handler.clone()).await;

        manager.dispatch(CONTACT_FORM_TAG).await.unwrap();
        assert_eq!(handler.attempts(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_retries_flapping_handler() {
        let manager = SyncManager::new(Capabilities::default());
        let handler = FlakyHandler::new(1);
        manager.register(CONTACT_FORM_TAG, handler.clone()).await;

        manager.dispatch(CONTACT_FORM_TAG).await.unwrap();
        assert_eq!(handler.attempts(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tag() {
        let manager = SyncManager::new(Capabilities::default());
        let result = manager.dispatch("no-such-tag").await;
        assert!(matches!(result, Err(WorkerError::UnknownSyncTag(_))));
    }

    #[tokio::test]
    async fn test_periodic_requires_capability() {
        let manager = SyncManager::new(Capabilities {
            periodic_sync: false,
        });
        let result = manager
            .register_periodic(CONTENT_REFRESH_TAG, FlakyHandler::new(0))
            .await;
        assert!(matches!(
            result,
            Err(WorkerError::PeriodicSyncUnsupported)
        ));
    }

    #[tokio::test]
    async fn test_periodic_dispatch_with_capability() {
        let manager = SyncManager::new(Capabilities {
            periodic_sync: true,
        });
        let handler = FlakyHandler::new(0);
        manager
            .register_periodic(CONTENT_REFRESH_TAG, handler.clone())
            .await
            .unwrap();

        manager.dispatch_periodic(CONTENT_REFRESH_TAG).await.unwrap();
        assert_eq!(handler.attempts(), 1);
    }
}
