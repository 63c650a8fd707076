//! # Lumen Service Worker
//!
//! Offline cache orchestration for the Lumen Studio site.
//!
//! ## Features
//!
//! - **Request classification**: path-prefix and extension rules decide
//!   never-cache, network-first, cache-first, or image handling
//! - **Caching strategies**: network-first, cache-first,
//!   stale-while-revalidate, and passthrough over durable stores
//! - **Bounded stores**: dynamic and image stores are FIFO-trimmed
//! - **Lifecycle**: install pre-warms the shell, activation drops stale
//!   store generations and claims open pages
//! - **Background sync & push**: tag→handler replay on reconnect, fixed
//!   notification rendering
//! - **Control channel**: pages command the worker over typed messages
//!
//! ## Architecture
//!
//! ```text
//! WorkerEvent (fetch / install / activate / sync / push / message)
//!     │
//!     └── ServiceWorker
//!             ├── classify  ──────────► Classification
//!             ├── StrategyEngine ─────► StoreRegistry + Fetch
//!             ├── Lifecycle            (Installing → Installed → Active)
//!             ├── Clients              (controlled pages)
//!             └── SyncManager          (tag → handler)
//! ```
//!
//! The worker holds no durable in-memory state: the host may stop and
//! restart it between any two events, so everything that must survive
//! lives in the [`lumen_store::StoreRegistry`].

use thiserror::Error;

pub mod classify;
pub mod clients;
pub mod config;
pub mod control;
pub mod events;
pub mod fallback;
pub mod lifecycle;
pub mod notify;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use classify::{classify, Classification};
pub use clients::{Client, Clients, FocusOutcome};
pub use config::{Capabilities, WorkerConfig};
pub use control::ControlMessage;
pub use events::{EventOutcome, WorkerEvent};
pub use lifecycle::{Lifecycle, WorkerState};
pub use notify::{build_notification, Notification, NotificationAction};
pub use strategy::StrategyEngine;
pub use sync::{SyncHandler, SyncManager, CONTACT_FORM_TAG, CONTENT_REFRESH_TAG};
pub use worker::ServiceWorker;

use lumen_net::NetError;
use lumen_store::StoreError;

/// Errors that can occur in worker operations.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkerState,
        to: WorkerState,
    },

    #[error("Unknown sync tag: {0}")]
    UnknownSyncTag(String),

    #[error("Sync replay failed: {0}")]
    SyncReplay(String),

    #[error("Periodic sync is not available on this host")]
    PeriodicSyncUnsupported,

    #[error("Invalid control message: {0}")]
    Control(String),
}
