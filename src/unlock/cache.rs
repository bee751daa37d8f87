//! Session-scoped analysis snapshot cache.

use std::sync::{Arc, OnceLock};

use crate::gateway::AnalysisSnapshot;

/// Holds the snapshot fetched during a session.
///
/// Written at most once, then read for the rest of the session. A snapshot
/// is only served back for the address it was fetched for.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    inner: OnceLock<Arc<AnalysisSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot for `address`, if any.
    pub fn get(&self, address: &str) -> Option<Arc<AnalysisSnapshot>> {
        self.inner
            .get()
            .filter(|s| s.address == address)
            .cloned()
    }

    /// Store the session's snapshot. Returns false, keeping the first one, if
    /// the cache was already written.
    pub fn insert(&self, snapshot: Arc<AnalysisSnapshot>) -> bool {
        let address = snapshot.address.clone();
        let stored = self.inner.set(snapshot).is_ok();
        if !stored {
            tracing::debug!(address = %address, "Snapshot already cached, keeping first");
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(address: &str, total: u64) -> Arc<AnalysisSnapshot> {
        Arc::new(AnalysisSnapshot {
            address: address.to_string(),
            data: json!({ "total": total }),
        })
    }

    #[test]
    fn test_cache_operations() {
        let cache = SnapshotCache::new();
        assert!(cache.get("ADDR1").is_none());

        assert!(cache.insert(snapshot("ADDR1", 10)));
        assert_eq!(cache.get("ADDR1").unwrap().data["total"], 10);
        assert!(cache.get("ADDR2").is_none());
    }

    #[test]
    fn test_written_once() {
        let cache = SnapshotCache::new();
        cache.insert(snapshot("ADDR1", 10));
        assert!(!cache.insert(snapshot("ADDR1", 99)));
        assert_eq!(cache.get("ADDR1").unwrap().data["total"], 10);
    }
}
