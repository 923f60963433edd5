use crate::app::ports::ObjectStore;
use crate::error::{PipelineError, Result};
use crate::types::{PlayEvent, DATASET_COLUMNS};
use std::sync::Arc;
use tracing::{debug, info};

/// The cumulative dataset, stored as one CSV object.
pub struct DatasetStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl DatasetStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// `None` when no dataset has been written yet.
    pub async fn load(&self) -> Result<Option<Vec<PlayEvent>>> {
        let Some(bytes) = self.store.get(&self.key).await? else {
            debug!(key = %self.key, "No existing dataset");
            return Ok(None);
        };
        let events = decode(&bytes)?;
        debug!(key = %self.key, rows = events.len(), "Loaded existing dataset");
        Ok(Some(events))
    }

    pub async fn save(&self, events: &[PlayEvent]) -> Result<()> {
        let bytes = encode(events)?;
        self.store.put(&self.key, bytes).await?;
        info!(key = %self.key, rows = events.len(), "Wrote dataset");
        Ok(())
    }
}

pub fn encode(events: &[PlayEvent]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    // Header written explicitly so an empty dataset still carries it
    writer.write_record(DATASET_COLUMNS)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Dataset(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Vec<PlayEvent>> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .enumerate()
        .map(|(row, record)| {
            record.map_err(|e| PipelineError::Dataset(format!("row {}: {}", row + 1, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryObjectStore;
    use chrono::{DateTime, NaiveDate};

    fn event(context: Option<(&str, &str)>) -> PlayEvent {
        PlayEvent {
            played_at: "2024-01-01T10:00:00.500Z".to_string(),
            track_name: "Song, with comma".to_string(),
            track_uri: "spotify:track:1".to_string(),
            artist_name: "Band \"quoted\"".to_string(),
            artist_uri: "spotify:artist:1".to_string(),
            album_name: "Album".to_string(),
            album_uri: "spotify:album:1".to_string(),
            duration_ms: 215000,
            explicit: true,
            context_type: context.map(|c| c.0.to_string()),
            context_uri: context.map(|c| c.1.to_string()),
            played_at_local: DateTime::parse_from_rfc3339("2024-01-01T10:00:00.500Z").unwrap(),
            derived_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            derived_hour: 10,
            genre: "indie pop, bedroom pop".to_string(),
        }
    }

    #[test]
    fn test_header_row() {
        let bytes = encode(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), DATASET_COLUMNS.join(","));
        assert!(decode(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_quoting_and_optional_context_survive() {
        let events = vec![event(None), event(Some(("album", "spotify:album:7")))];
        let decoded = decode(&encode(&events).unwrap()).unwrap();
        assert_eq!(decoded, events);
    }

    #[test]
    fn test_unparseable_row_is_dataset_error() {
        let mut text = String::from_utf8(encode(&[event(None)]).unwrap()).unwrap();
        text.push_str("garbage,row\n");
        assert!(matches!(
            decode(text.as_bytes()),
            Err(PipelineError::Dataset(_))
        ));
    }

    #[tokio::test]
    async fn test_load_absent_is_none() {
        let store = DatasetStore::new(Arc::new(InMemoryObjectStore::new()), "out.csv");
        assert!(store.load().await.unwrap().is_none());
    }
}
