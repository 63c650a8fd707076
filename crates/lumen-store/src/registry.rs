//! The store registry: logical namespaces, generations, and cutover.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{schema, store::CacheStore, StoreError};

/// The four logical store namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The minimal set of routes/assets needed for offline navigation.
    Shell,
    /// Fingerprinted static assets. Unbounded.
    Static,
    /// API/dynamic responses. Bounded.
    Dynamic,
    /// Image and media responses. Bounded.
    Images,
}

impl Namespace {
    /// Every namespace, in declaration order.
    pub const ALL: [Namespace; 4] = [
        Namespace::Shell,
        Namespace::Static,
        Namespace::Dynamic,
        Namespace::Images,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Shell => "shell",
            Namespace::Static => "static",
            Namespace::Dynamic => "dynamic",
            Namespace::Images => "images",
        }
    }
}

/// Maps logical namespaces to named, durable stores for one deployment
/// generation, and deletes stale generations on cutover.
#[derive(Clone)]
pub struct StoreRegistry {
    conn: Arc<Mutex<Connection>>,
    prefix: String,
    tag: String,
}

impl StoreRegistry {
    /// Open the registry backed by a database file.
    pub fn open(path: &Path, prefix: &str, tag: &str) -> Result<Self, StoreError> {
        let conn = schema::open_database(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Open an in-memory registry (tests, ephemeral hosts).
    pub fn in_memory(prefix: &str, tag: &str) -> Result<Self, StoreError> {
        let conn = schema::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.to_string(),
            tag: tag.to_string(),
        })
    }

    /// The deployment generation tag this registry serves.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The full store name for a namespace in the current generation,
    /// `"{prefix}-{namespace}-{tag}"`.
    pub fn store_name(&self, namespace: Namespace) -> String {
        format!("{}-{}-{}", self.prefix, namespace.as_str(), self.tag)
    }

    /// The complete expected name set for the current generation.
    pub fn expected_names(&self) -> Vec<String> {
        Namespace::ALL.iter().map(|ns| self.store_name(*ns)).collect()
    }

    /// Open (lazily creating) the store for a namespace.
    pub async fn open_store(&self, namespace: Namespace) -> Result<CacheStore, StoreError> {
        self.open_named(&self.store_name(namespace)).await
    }

    /// Open (lazily creating) a store by full name.
    ///
    /// Used by activation tests to seed stale generations; normal callers
    /// go through [`StoreRegistry::open_store`].
    pub async fn open_named(&self, name: &str) -> Result<CacheStore, StoreError> {
        {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                rusqlite::params![name, Utc::now().timestamp()],
            )?;
        }
        debug!(store = name, "Opened store");
        Ok(CacheStore::new(name.to_string(), self.conn.clone()))
    }

    /// All known store names.
    pub async fn store_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Whether a store with the given full name exists.
    pub async fn has(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stores WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a store and all its entries. Returns whether it existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", [name])?;
        Ok(deleted > 0)
    }

    /// Generation cutover: delete every store carrying this registry's
    /// prefix whose full name is not in the current expected set. Stores
    /// outside the prefix are left alone. Returns the deleted names.
    pub async fn purge_stale_generations(&self) -> Result<Vec<String>, StoreError> {
        let expected = self.expected_names();
        let marker = format!("{}-", self.prefix);

        let names = self.store_names().await?;
        let mut purged = Vec::new();

        for name in names {
            if name.starts_with(&marker) && !expected.contains(&name) {
                self.delete_store(&name).await?;
                purged.push(name);
            }
        }

        if !purged.is_empty() {
            info!(count = purged.len(), ?purged, "Purged stale store generations");
        }
        Ok(purged)
    }
}
