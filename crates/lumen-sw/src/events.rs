//! The event dispatch surface.
//!
//! The host hands the worker browser-dispatched events; the worker maps
//! each kind to its handler. Every event is an independent task over the
//! shared store registry.

use lumen_net::{Request, Response};

use crate::control::ControlMessage;
use crate::notify::Notification;

/// An event delivered by the host.
#[derive(Debug)]
pub enum WorkerEvent {
    /// An intercepted network request.
    Fetch(Request),
    /// Worker installation.
    Install,
    /// Worker activation.
    Activate,
    /// A one-shot background sync fired.
    Sync { tag: String },
    /// A periodic sync fired.
    PeriodicSync { tag: String },
    /// A push message arrived.
    Push { payload: String },
    /// The user clicked a notification action.
    NotificationClick { action: String },
    /// A page sent a control message.
    Message(ControlMessage),
}

/// What an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    /// The response for a fetch event.
    Response(Response),
    /// The notification rendered for a push event.
    Notification(Notification),
    /// The event completed with nothing to hand back.
    None,
}
