use crate::types::PlayEvent;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Fold `new` into `existing`: one record per play instant, `new` winning on
/// collisions, ascending by play time.
pub fn merge(existing: Vec<PlayEvent>, new: Vec<PlayEvent>) -> Vec<PlayEvent> {
    let mut by_instant: BTreeMap<DateTime<Utc>, PlayEvent> = BTreeMap::new();
    for event in existing.into_iter().chain(new) {
        by_instant.insert(event.instant(), event);
    }
    by_instant.into_values().collect()
}
