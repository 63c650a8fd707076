//! Push notification rendering.
//!
//! Payload handling is deliberately thin: the display text is extracted
//! and everything else (icon, badge, vibration, actions) is fixed.

use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;

/// Notification action identifier: open the site.
pub const ACTION_OPEN: &str = "open";

/// Notification action identifier: dismiss.
pub const ACTION_DISMISS: &str = "dismiss";

/// One button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A rendered notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibration: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    /// Site-relative URL opened by the `open` action.
    pub target: String,
}

/// Render the fixed-shape notification for a push payload.
pub fn build_notification(config: &WorkerConfig, payload: &str) -> Notification {
    let body = payload.trim();
    let body = if body.is_empty() {
        "New update from the studio".to_string()
    } else {
        body.to_string()
    };

    Notification {
        title: config.site_name.clone(),
        body,
        icon: "/icons/icon-192.png".to_string(),
        badge: "/icons/badge-72.png".to_string(),
        vibration: vec![100, 50, 100],
        actions: vec![
            NotificationAction {
                action: ACTION_OPEN.to_string(),
                title: "Open site".to_string(),
            },
            NotificationAction {
                action: ACTION_DISMISS.to_string(),
                title: "Dismiss".to_string(),
            },
        ],
        target: config.shell_root.clone(),
    }
}
