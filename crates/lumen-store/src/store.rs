//! A single named cache store.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::trace;

use crate::{evict, CacheKey, StoreError, StoredResponse};

/// A handle to one named key→response store.
///
/// Handles are cheap to clone; all of them share the registry's database
/// connection. Every operation takes the connection lock for the duration
/// of one statement, so interleavings between events are per-statement,
/// last-write-wins.
#[derive(Clone)]
pub struct CacheStore {
    name: String,
    conn: Arc<Mutex<Connection>>,
}

impl CacheStore {
    pub(crate) fn new(name: String, conn: Arc<Mutex<Connection>>) -> Self {
        Self { name, conn }
    }

    /// The full store name, including prefix and generation tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the given key, replacing any prior entry.
    ///
    /// A replace keeps the original insertion position.
    pub async fn put(&self, key: &CacheKey, response: &StoredResponse) -> Result<(), StoreError> {
        let headers = serde_json::to_string(&response.headers)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO entries (store, key, status, headers, body, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(store, key) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                inserted_at = excluded.inserted_at",
            params![
                self.name,
                key.as_storage_key(),
                response.status,
                headers,
                response.body,
                response.inserted_at,
            ],
        )?;
        trace!(store = %self.name, key = %key.as_storage_key(), "Stored entry");
        Ok(())
    }

    /// Look up the stored response for a key.
    pub async fn match_key(&self, key: &CacheKey) -> Result<Option<StoredResponse>, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT status, headers, body, inserted_at
                 FROM entries WHERE store = ?1 AND key = ?2",
                params![self.name, key.as_storage_key()],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((status, headers, body, inserted_at)) => Ok(Some(StoredResponse {
                status,
                headers: serde_json::from_str(&headers)?,
                body,
                inserted_at,
            })),
            None => Ok(None),
        }
    }

    /// Delete the entry for a key. Returns whether an entry existed.
    pub async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM entries WHERE store = ?1 AND key = ?2",
            params![self.name, key.as_storage_key()],
        )?;
        Ok(deleted > 0)
    }

    /// All storage keys, oldest insertion first.
    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT key FROM entries WHERE store = ?1 ORDER BY id ASC")?;
        let keys = stmt
            .query_map([&self.name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Number of entries.
    pub async fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE store = ?1",
            [&self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Whether the store has no entries.
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM entries WHERE store = ?1", [&self.name])?;
        Ok(())
    }

    /// Bound this store to `max_entries`, evicting oldest-inserted first.
    /// Returns the number of evicted entries.
    pub async fn trim(&self, max_entries: usize) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        evict::trim_store(&conn, &self.name, max_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Namespace, StoreRegistry};
    use url::Url;

    fn key(path: &str) -> CacheKey {
        let url = Url::parse(&format!("https://lumenstudio.example{}", path)).unwrap();
        CacheKey::new("GET", &url)
    }

    fn stored(body: &[u8]) -> StoredResponse {
        StoredResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.to_vec(),
            inserted_at: 0,
        }
    }

    async fn store() -> CacheStore {
        let registry = StoreRegistry::in_memory("lumen", "v1").unwrap();
        registry.open_store(Namespace::Static).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let store = store().await;
        store.put(&key("/a.css"), &stored(b"a{}")).await.unwrap();

        let found = store.match_key(&key("/a.css")).await.unwrap().unwrap();
        assert_eq!(found.body, b"a{}");
        assert_eq!(found.status, 200);

        assert!(store.match_key(&key("/b.css")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_keeps_single_entry() {
        let store = store().await;
        store.put(&key("/a.css"), &stored(b"v1")).await.unwrap();
        store.put(&key("/a.css"), &stored(b"v2")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let found = store.match_key(&key("/a.css")).await.unwrap().unwrap();
        assert_eq!(found.body, b"v2");
    }

    #[tokio::test]
    async fn test_replace_keeps_insertion_order() {
        let store = store().await;
        store.put(&key("/old"), &stored(b"old")).await.unwrap();
        store.put(&key("/new"), &stored(b"new")).await.unwrap();
        // Rewriting the oldest entry must not move it to the back.
        store.put(&key("/old"), &stored(b"old2")).await.unwrap();

        let keys = store.keys().await.unwrap();
        assert_eq!(
            keys,
            vec![
                "GET https://lumenstudio.example/old",
                "GET https://lumenstudio.example/new",
            ]
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        store.put(&key("/a"), &stored(b"a")).await.unwrap();

        assert!(store.delete(&key("/a")).await.unwrap());
        assert!(!store.delete(&key("/a")).await.unwrap());
        assert!(store.match_key(&key("/a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store().await;
        store.put(&key("/a"), &stored(b"a")).await.unwrap();
        store.put(&key("/b"), &stored(b"b")).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }
}
