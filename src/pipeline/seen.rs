use crate::app::ports::ObjectStore;
use crate::error::{PipelineError, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Durable set of batch ids already folded into the dataset.
pub struct SeenBatchTracker {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl SeenBatchTracker {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Empty when nothing has been saved yet.
    pub async fn load(&self) -> Result<BTreeSet<String>> {
        let Some(bytes) = self.store.get(&self.key).await? else {
            debug!(key = %self.key, "No seen-batch set yet");
            return Ok(BTreeSet::new());
        };
        let ids: Vec<String> = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::storage(&self.key, format!("corrupt seen-batch set: {}", e)))?;
        Ok(ids.into_iter().collect())
    }

    /// Ids in `all` that are not in `seen`, sorted and without repeats.
    pub fn filter_new(all: &[String], seen: &BTreeSet<String>) -> Vec<String> {
        all.iter()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn save(&self, seen: &BTreeSet<String>) -> Result<()> {
        let ids: Vec<&String> = seen.iter().collect();
        let bytes = serde_json::to_vec(&ids)?;
        self.store.put(&self.key, bytes).await?;
        debug!(key = %self.key, count = seen.len(), "Saved seen-batch set");
        Ok(())
    }
}
