//! The page→worker control channel.
//!
//! Pages command the worker with small typed JSON messages; the wire
//! shape is `{"type": "SKIP_WAITING"}` / `{"type": "UPDATE_CACHE"}`.

use serde::{Deserialize, Serialize};

use crate::WorkerError;

/// A message from a page client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Force immediate activation instead of waiting for pages to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Force re-population of the shell store from its manifest.
    #[serde(rename = "UPDATE_CACHE")]
    UpdateCache,
}

impl ControlMessage {
    /// Parse a raw message off the channel.
    pub fn parse(raw: &str) -> Result<Self, WorkerError> {
        serde_json::from_str(raw).map_err(|e| WorkerError::Control(e.to_string()))
    }
}
