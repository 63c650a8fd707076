//! Connected page clients.
//!
//! A minimal model of the pages under this worker's control: enough to
//! take over existing pages on activation and to focus or open a window
//! when a notification is clicked.

use hashbrown::HashMap;
use url::Url;

/// A connected page.
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID, unique within this worker.
    pub id: u64,
    /// Page URL.
    pub url: Url,
    /// Whether the page currently has focus.
    pub focused: bool,
    /// Whether this worker controls the page.
    pub controlled: bool,
}

/// Outcome of routing a notification click to a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// An existing client window was focused.
    Focused(u64),
    /// A new client window was opened.
    Opened(u64),
}

/// Registry of connected pages.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<u64, Client>,
    next_id: u64,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected page. New pages are uncontrolled until
    /// the worker claims them.
    pub fn connect(&mut self, url: Url) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.clients.insert(
            id,
            Client {
                id,
                url,
                focused: false,
                controlled: false,
            },
        );
        id
    }

    /// Remove a disconnected page.
    pub fn disconnect(&mut self, id: u64) -> Option<Client> {
        self.clients.remove(&id)
    }

    /// Get a client by ID.
    pub fn get(&self, id: u64) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Number of connected pages.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no pages are connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Take control of every connected page immediately, rather than only
    /// future navigations. Returns how many pages changed controller.
    pub fn claim(&mut self) -> usize {
        let mut claimed = 0;
        for client in self.clients.values_mut() {
            if !client.controlled {
                client.controlled = true;
                claimed += 1;
            }
        }
        claimed
    }

    /// Whether every connected page is controlled.
    pub fn all_controlled(&self) -> bool {
        self.clients.values().all(|c| c.controlled)
    }

    /// Focus the oldest connected window, or open a new one at `url`.
    pub fn focus_or_open(&mut self, url: &Url) -> FocusOutcome {
        let oldest = self.clients.keys().min().copied();
        match oldest {
            Some(id) => {
                for client in self.clients.values_mut() {
                    client.focused = client.id == id;
                }
                FocusOutcome::Focused(id)
            }
            None => {
                let id = self.connect(url.clone());
                if let Some(client) = self.clients.get_mut(&id) {
                    client.focused = true;
                    client.controlled = true;
                }
                FocusOutcome::Opened(id)
            }
        }
    }
}
