//! Bounding a store's entry count.
//!
//! Eviction is strictly FIFO by insertion: no LRU/LFU bookkeeping is kept.
//! Concurrent trims can interleave; each call recomputes the count, so the
//! bound re-converges on the next write.

use rusqlite::{params, Connection};
use tracing::debug;

use crate::StoreError;

/// Trim the named store down to `max_entries`, deleting oldest-inserted
/// entries first. Returns the number of evicted entries.
pub fn trim_store(
    conn: &Connection,
    store: &str,
    max_entries: usize,
) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE store = ?1",
        [store],
        |row| row.get(0),
    )?;

    let excess = (count as usize).saturating_sub(max_entries);
    if excess == 0 {
        return Ok(0);
    }

    let evicted = conn.execute(
        "DELETE FROM entries WHERE store = ?1 AND id IN (
            SELECT id FROM entries WHERE store = ?1 ORDER BY id ASC LIMIT ?2
        )",
        params![store, excess as i64],
    )?;

    debug!(store, evicted, max_entries, "Trimmed store");
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use crate::registry::{Namespace, StoreRegistry};
    use crate::{CacheKey, StoredResponse};
    use url::Url;

    fn key(path: &str) -> CacheKey {
        let url = Url::parse(&format!("https://lumenstudio.example{}", path)).unwrap();
        CacheKey::new("GET", &url)
    }

    fn stored() -> StoredResponse {
        StoredResponse {
            status: 200,
            headers: Vec::new(),
            body: b"x".to_vec(),
            inserted_at: 0,
        }
    }

    #[tokio::test]
    async fn test_trim_is_fifo() {
        let registry = StoreRegistry::in_memory("lumen", "v1").unwrap();
        let store = registry.open_store(Namespace::Images).await.unwrap();

        for i in 0..7 {
            store.put(&key(&format!("/images/{}.jpg", i)), &stored()).await.unwrap();
        }

        let evicted = store.trim(4).await.unwrap();
        assert_eq!(evicted, 3);
        assert_eq!(store.len().await.unwrap(), 4);

        // The most-recently-inserted 4 keys survive.
        let keys = store.keys().await.unwrap();
        let expected: Vec<String> = (3..7)
            .map(|i| format!("GET https://lumenstudio.example/images/{}.jpg", i))
            .collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_trim_under_limit_is_noop() {
        let registry = StoreRegistry::in_memory("lumen", "v1").unwrap();
        let store = registry.open_store(Namespace::Dynamic).await.unwrap();

        store.put(&key("/api/posts"), &stored()).await.unwrap();

        assert_eq!(store.trim(10).await.unwrap(), 0);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trim_only_touches_named_store() {
        let registry = StoreRegistry::in_memory("lumen", "v1").unwrap();
        let images = registry.open_store(Namespace::Images).await.unwrap();
        let dynamic = registry.open_store(Namespace::Dynamic).await.unwrap();

        for i in 0..3 {
            images.put(&key(&format!("/images/{}.jpg", i)), &stored()).await.unwrap();
            dynamic.put(&key(&format!("/api/{}", i)), &stored()).await.unwrap();
        }

        images.trim(1).await.unwrap();

        assert_eq!(images.len().await.unwrap(), 1);
        assert_eq!(dynamic.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rewritten_oldest_entry_still_evicted_first() {
        let registry = StoreRegistry::in_memory("lumen", "v1").unwrap();
        let store = registry.open_store(Namespace::Images).await.unwrap();

        store.put(&key("/images/a.jpg"), &stored()).await.unwrap();
        store.put(&key("/images/b.jpg"), &stored()).await.unwrap();
        // A rewrite does not move /images/a.jpg to the back of the queue.
        store.put(&key("/images/a.jpg"), &stored()).await.unwrap();

        store.trim(1).await.unwrap();

        assert!(store.match_key(&key("/images/a.jpg")).await.unwrap().is_none());
        assert!(store.match_key(&key("/images/b.jpg")).await.unwrap().is_some());
    }
}
