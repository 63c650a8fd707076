//! The worker: event routing over the shared store registry.
//!
//! The worker object itself is disposable. The host may drop it between
//! any two events and build a fresh one from the same config and
//! registry; nothing an event needs survives in worker memory.

use std::sync::Arc;

use lumen_net::{Fetch, Request, Response};
use lumen_store::{CacheKey, Namespace, StoreRegistry, StoredResponse};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::{Clients, FocusOutcome};
use crate::config::WorkerConfig;
use crate::control::ControlMessage;
use crate::events::{EventOutcome, WorkerEvent};
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::notify::{build_notification, Notification, ACTION_OPEN};
use crate::strategy::StrategyEngine;
use crate::sync::SyncManager;
use crate::WorkerError;

/// The Lumen service worker.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    registry: StoreRegistry,
    engine: StrategyEngine,
    lifecycle: Lifecycle,
    clients: RwLock<Clients>,
    sync: SyncManager,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, registry: StoreRegistry, fetcher: Arc<dyn Fetch>) -> Self {
        let config = Arc::new(config);
        let engine = StrategyEngine::new(config.clone(), registry.clone(), fetcher);
        let sync = SyncManager::new(config.capabilities);

        Self {
            config,
            registry,
            engine,
            lifecycle: Lifecycle::new(),
            clients: RwLock::new(Clients::new()),
            sync,
        }
    }

    /// The worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The sync manager, for registering tag handlers.
    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.current().await
    }

    /// A page connected to this worker's scope.
    pub async fn connect_client(&self, url: Url) -> u64 {
        self.clients.write().await.connect(url)
    }

    /// A page went away.
    pub async fn disconnect_client(&self, id: u64) {
        self.clients.write().await.disconnect(id);
    }

    /// Whether every connected page is controlled by this worker.
    pub async fn controls_all_clients(&self) -> bool {
        self.clients.read().await.all_controlled()
    }

    /// Route one host event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, WorkerError> {
        match event {
            WorkerEvent::Fetch(request) => {
                self.handle_fetch(&request).await.map(EventOutcome::Response)
            }
            WorkerEvent::Install => self.install().await.map(|_| EventOutcome::None),
            WorkerEvent::Activate => self.activate().await.map(|_| EventOutcome::None),
            WorkerEvent::Sync { tag } => {
                self.sync.dispatch(&tag).await.map(|_| EventOutcome::None)
            }
            WorkerEvent::PeriodicSync { tag } => self
                .sync
                .dispatch_periodic(&tag)
                .await
                .map(|_| EventOutcome::None),
            WorkerEvent::Push { payload } => {
                Ok(EventOutcome::Notification(self.on_push(&payload)))
            }
            WorkerEvent::NotificationClick { action } => {
                self.on_notification_click(&action).await;
                Ok(EventOutcome::None)
            }
            WorkerEvent::Message(message) => {
                self.on_message(message).await.map(|_| EventOutcome::None)
            }
        }
    }

    /// Handle one intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, WorkerError> {
        self.engine.handle(request).await
    }

    /// Install: pre-warm the shell store, then ask for immediate
    /// activation rather than waiting for open pages to close.
    pub async fn install(&self) -> Result<(), WorkerError> {
        info!(version = %self.config.version, "Installing worker");

        let warmed = self.prewarm_shell().await;
        if warmed < self.config.shell_manifest.len() {
            warn!(
                warmed,
                manifest = self.config.shell_manifest.len(),
                "Shell pre-warm incomplete; offline coverage degraded"
            );
        }

        self.lifecycle.advance(WorkerState::Installed).await?;
        info!("Install complete; requesting immediate activation");
        Ok(())
    }

    /// Activate: drop stale store generations and take over open pages.
    pub async fn activate(&self) -> Result<(), WorkerError> {
        info!(version = %self.config.version, "Activating worker");

        match self.registry.purge_stale_generations().await {
            Ok(purged) if !purged.is_empty() => {
                debug!(?purged, "Dropped stale generations");
            }
            Ok(_) => {}
            Err(err) => {
                // Stale stores linger until the next activation; not fatal.
                warn!(error = %err, "Generation purge failed");
            }
        }

        let claimed = self.clients.write().await.claim();
        if claimed > 0 {
            info!(claimed, "Took control of open pages");
        }

        self.lifecycle.advance(WorkerState::Active).await?;
        Ok(())
    }

    /// Fetch each shell manifest entry into the shell store. Per-entry
    /// failures are logged and skipped. Returns how many entries landed.
    async fn prewarm_shell(&self) -> usize {
        let store = match self.registry.open_store(Namespace::Shell).await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "Shell store unavailable; skipping pre-warm");
                return 0;
            }
        };

        let mut warmed = 0;
        for path in &self.config.shell_manifest {
            let Some(url) = self.config.site_url(path) else {
                warn!(path = %path, "Bad shell manifest entry");
                continue;
            };

            let request = Request::get(url.clone());
            match self.engine.fetch_direct(&request).await {
                Ok(response) if response.is_success() => {
                    let key = CacheKey::new("GET", &url);
                    match store.put(&key, &StoredResponse::from_response(&response)).await {
                        Ok(()) => warmed += 1,
                        Err(err) => warn!(path = %path, error = %err, "Shell store write failed"),
                    }
                }
                Ok(response) => {
                    warn!(path = %path, status = %response.status, "Shell entry fetch returned error status");
                }
                Err(err) => {
                    warn!(path = %path, error = %err, "Shell entry fetch failed");
                }
            }
        }

        debug!(warmed, "Shell pre-warm finished");
        warmed
    }

    /// Render the notification for a push payload.
    pub fn on_push(&self, payload: &str) -> Notification {
        debug!("Push received");
        build_notification(&self.config, payload)
    }

    /// Route a notification click: `open` focuses or opens a window,
    /// anything else dismisses.
    pub async fn on_notification_click(&self, action: &str) {
        if action != ACTION_OPEN {
            debug!(action, "Notification dismissed");
            return;
        }

        let Some(target) = self.config.shell_root_url() else {
            warn!("No shell root URL to open");
            return;
        };

        match self.clients.write().await.focus_or_open(&target) {
            FocusOutcome::Focused(id) => debug!(client = id, "Focused existing window"),
            FocusOutcome::Opened(id) => debug!(client = id, "Opened new window"),
        }
    }

    /// Handle a control message from a page.
    pub async fn on_message(&self, message: ControlMessage) -> Result<(), WorkerError> {
        match message {
            ControlMessage::SkipWaiting => {
                let state = self.lifecycle.current().await;
                if state == WorkerState::Installed {
                    info!("Page requested immediate activation");
                    self.activate().await
                } else {
                    debug!(%state, "SKIP_WAITING ignored");
                    Ok(())
                }
            }
            ControlMessage::UpdateCache => {
                info!("Page requested shell refresh");
                self.prewarm_shell().await;
                Ok(())
            }
        }
    }
}
