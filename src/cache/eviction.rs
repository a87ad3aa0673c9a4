// src/cache/eviction.rs
//! Size ceiling for the image partition.

use anyhow::Result;
use metrics::counter;

use super::storage::CacheStorage;

/// Make room for an `incoming`-byte entry in `partition`.
///
/// Entries are measured and walked smallest first; the running total of kept
/// bytes plus `incoming` may not exceed `max_bytes`, so the largest entries
/// go first. Ties are broken by key for a deterministic outcome. Returns the
/// evicted keys.
pub async fn make_room(
    storage: &dyn CacheStorage,
    partition: &str,
    max_bytes: u64,
    incoming: u64,
) -> Result<Vec<String>> {
    let budget = max_bytes.saturating_sub(incoming);

    let mut sized = Vec::new();
    for key in storage.keys(partition).await? {
        let size = storage
            .lookup(partition, &key)
            .await?
            .map(|r| r.size())
            .unwrap_or(0);
        sized.push((size, key));
    }
    sized.sort();

    let mut kept = 0u64;
    let mut evicted = Vec::new();
    for (size, key) in sized {
        if kept + size > budget {
            if storage.remove(partition, &key).await? {
                evicted.push(key);
            }
            continue;
        }
        kept += size;
    }

    if !evicted.is_empty() {
        counter!("cache_evictions_total").increment(evicted.len() as u64);
        tracing::debug!(target: "cache", partition, evicted = evicted.len(), kept, "image partition pruned");
    }
    Ok(evicted)
}
