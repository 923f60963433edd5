use crate::app::ports::ObjectStore;
use crate::error::{PipelineError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

pub type GenreMap = BTreeMap<String, String>;

/// Durable artist-uri -> genre table. Entries are never refreshed once written,
/// including the "Unknown" ones.
pub struct GenreCache {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl GenreCache {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub async fn load(&self) -> Result<GenreMap> {
        let Some(bytes) = self.store.get(&self.key).await? else {
            debug!(key = %self.key, "No genre cache yet");
            return Ok(GenreMap::new());
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::storage(&self.key, format!("corrupt genre cache: {}", e)))
    }

    /// Fresh entries extend or override; nothing is removed.
    pub fn merge(existing: GenreMap, fresh: GenreMap) -> GenreMap {
        let mut merged = existing;
        merged.extend(fresh);
        merged
    }

    /// Artist uris that have no entry yet, in first-seen order.
    pub fn missing<'a, I>(cache: &GenreMap, artist_uris: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = BTreeSet::new();
        artist_uris
            .into_iter()
            .filter(|uri| !cache.contains_key(*uri) && seen.insert(*uri))
            .map(str::to_string)
            .collect()
    }

    pub async fn save(&self, cache: &GenreMap) -> Result<()> {
        let bytes = serde_json::to_vec(cache)?;
        self.store.put(&self.key, bytes).await?;
        debug!(key = %self.key, entries = cache.len(), "Saved genre cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryObjectStore;

    fn map(entries: &[(&str, &str)]) -> GenreMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_never_deletes() {
        let existing = map(&[("a", "rock"), ("b", "Unknown")]);
        let fresh = map(&[("b", "jazz"), ("c", "folk")]);
        let merged = GenreCache::merge(existing, fresh);
        assert_eq!(merged, map(&[("a", "rock"), ("b", "jazz"), ("c", "folk")]));
    }

    #[test]
    fn test_missing_skips_cached_including_unknown() {
        let cache = map(&[("a", "rock"), ("b", "Unknown")]);
        let missing = GenreCache::missing(&cache, ["c", "a", "b", "d", "c"]);
        assert_eq!(missing, vec!["c".to_string(), "d".to_string()]);
    }

    #[tokio::test]
    async fn test_load_absent_then_roundtrip() {
        let store = Arc::new(InMemoryObjectStore::new());
        let cache = GenreCache::new(store, "genre_cache.json");
        assert!(cache.load().await.unwrap().is_empty());

        let entries = map(&[("spotify:artist:1", "indie pop, bedroom pop")]);
        cache.save(&entries).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), entries);
    }
}
