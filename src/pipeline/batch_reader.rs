use crate::app::ports::ObjectStore;
use crate::constants;
use crate::error::{BatchError, Result};
use crate::metrics::BatchMetrics;
use crate::types::ParsedPlay;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One "recently played" fetch as written by the capture job.
#[derive(Debug, Deserialize)]
struct RecentlyPlayedPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PlayHistoryItem {
    played_at: String,
    track: Track,
    #[serde(default)]
    context: Option<PlayContext>,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    uri: String,
    duration_ms: u64,
    explicit: bool,
    artists: Vec<NamedRef>,
    album: NamedRef,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct PlayContext {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

/// Plays flattened out of a set of batches, plus what was skipped.
#[derive(Debug, Default)]
pub struct BatchReadOutput {
    /// Deduplicated by play instant, ascending
    pub plays: Vec<ParsedPlay>,
    pub batches_read: usize,
    /// (batch id, reason)
    pub skipped: Vec<(String, String)>,
}

pub struct BatchReader {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl BatchReader {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Every batch id currently under the raw prefix.
    pub async fn discover(&self) -> Result<Vec<String>> {
        let keys = self.store.list(&self.prefix).await?;
        Ok(keys
            .into_iter()
            .filter(|k| constants::is_batch_key(k, &self.prefix))
            .collect())
    }

    /// Read and flatten `batch_ids` in order. A batch that fails to parse is
    /// skipped whole; a later batch wins over an earlier one for the same instant.
    pub async fn read_batches(&self, batch_ids: &[String]) -> Result<BatchReadOutput> {
        let mut by_instant: BTreeMap<DateTime<Utc>, ParsedPlay> = BTreeMap::new();
        let mut output = BatchReadOutput::default();

        for batch_id in batch_ids {
            let Some(bytes) = self.store.get(batch_id).await? else {
                warn!(batch_id = %batch_id, "Batch disappeared before it could be read, skipping");
                BatchMetrics::record_skipped();
                output
                    .skipped
                    .push((batch_id.clone(), "object not found".to_string()));
                continue;
            };
            match parse_batch(&bytes) {
                Ok(plays) => {
                    debug!(batch_id = %batch_id, plays = plays.len(), "Batch flattened");
                    BatchMetrics::record_read(plays.len());
                    output.batches_read += 1;
                    for play in plays {
                        by_instant.insert(play.instant(), play);
                    }
                }
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "Failed to process batch, skipping");
                    BatchMetrics::record_skipped();
                    output.skipped.push((batch_id.clone(), e.to_string()));
                }
            }
        }

        output.plays = by_instant.into_values().collect();
        info!(
            batches = batch_ids.len(),
            read = output.batches_read,
            skipped = output.skipped.len(),
            plays = output.plays.len(),
            "Read new batches"
        );
        Ok(output)
    }
}

/// Flatten one payload: a single JSON page, or one page per line.
pub fn parse_batch(bytes: &[u8]) -> std::result::Result<Vec<ParsedPlay>, BatchError> {
    let mut plays = Vec::new();
    let mut index = 0usize;
    for page in pages(bytes)? {
        for item in page.items {
            plays.push(flatten_item(index, item)?);
            index += 1;
        }
    }
    Ok(plays)
}

fn pages(bytes: &[u8]) -> std::result::Result<Vec<RecentlyPlayedPage>, BatchError> {
    if let Ok(page) = serde_json::from_slice::<RecentlyPlayedPage>(bytes) {
        return Ok(vec![page]);
    }
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        // Not newline-delimited either; report the whole-file error
        return Ok(vec![serde_json::from_slice(bytes)?]);
    }
    lines
        .into_iter()
        .map(|line| serde_json::from_str(line).map_err(BatchError::from))
        .collect()
}

fn flatten_item(index: usize, value: serde_json::Value) -> std::result::Result<ParsedPlay, BatchError> {
    let malformed = |reason: String| BatchError::MalformedItem { index, reason };

    let item: PlayHistoryItem =
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
    let played_at_local = DateTime::parse_from_rfc3339(&item.played_at)
        .map_err(|e| malformed(format!("bad played_at '{}': {}", item.played_at, e)))?;
    let Track {
        name,
        uri,
        duration_ms,
        explicit,
        artists,
        album,
    } = item.track;
    let artist = artists
        .into_iter()
        .next()
        .ok_or_else(|| malformed("track has no artists".to_string()))?;
    let (context_type, context_uri) = match item.context {
        Some(ctx) => (ctx.kind, ctx.uri),
        None => (None, None),
    };

    Ok(ParsedPlay {
        played_at: item.played_at,
        played_at_local,
        track_name: name,
        track_uri: uri,
        artist_name: artist.name,
        artist_uri: artist.uri,
        album_name: album.name,
        album_uri: album.uri,
        duration_ms,
        explicit,
        context_type,
        context_uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryObjectStore;
    use serde_json::json;

    fn item(played_at: &str, track: &str) -> serde_json::Value {
        json!({
            "played_at": played_at,
            "track": {
                "name": track,
                "uri": format!("spotify:track:{}", track),
                "duration_ms": 180000,
                "explicit": false,
                "artists": [
                    {"name": "First", "uri": "spotify:artist:1"},
                    {"name": "Second", "uri": "spotify:artist:2"}
                ],
                "album": {"name": "Album", "uri": "spotify:album:1"}
            },
            "context": {"type": "playlist", "uri": "spotify:playlist:9"}
        })
    }

    fn page(items: Vec<serde_json::Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "items": items })).unwrap()
    }

    #[test]
    fn test_flattens_first_artist_and_context() {
        let plays = parse_batch(&page(vec![item("2024-01-01T10:00:00.123Z", "a")])).unwrap();
        assert_eq!(plays.len(), 1);
        let play = &plays[0];
        assert_eq!(play.artist_uri, "spotify:artist:1");
        assert_eq!(play.artist_name, "First");
        assert_eq!(play.context_type.as_deref(), Some("playlist"));
        assert_eq!(play.duration_ms, 180000);
        assert_eq!(play.played_at, "2024-01-01T10:00:00.123Z");
    }

    #[test]
    fn test_null_context_and_missing_items() {
        let mut it = item("2024-01-01T10:00:00Z", "a");
        it["context"] = serde_json::Value::Null;
        let plays = parse_batch(&page(vec![it])).unwrap();
        assert_eq!(plays[0].context_type, None);
        assert_eq!(plays[0].context_uri, None);

        assert!(parse_batch(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_newline_delimited_pages() {
        let mut bytes = page(vec![item("2024-01-01T10:00:00Z", "a")]);
        bytes.push(b'\n');
        bytes.extend(page(vec![item("2024-01-01T11:00:00Z", "b")]));
        bytes.extend(b"\n\n");
        let plays = parse_batch(&bytes).unwrap();
        assert_eq!(plays.len(), 2);
    }

    #[test]
    fn test_malformed_item_fails_batch() {
        let mut bad = item("2024-01-01T10:00:00Z", "b");
        bad["track"]["artists"] = json!([]);
        let err = parse_batch(&page(vec![item("2024-01-01T09:00:00Z", "a"), bad])).unwrap_err();
        assert!(matches!(err, BatchError::MalformedItem { index: 1, .. }));

        let err = parse_batch(&page(vec![item("yesterday", "a")])).unwrap_err();
        assert!(matches!(err, BatchError::MalformedItem { index: 0, .. }));

        assert!(matches!(parse_batch(b"not json"), Err(BatchError::Json(_))));
    }

    #[tokio::test]
    async fn test_read_skips_bad_batch_and_later_batch_wins() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert("data/1.json", page(vec![item("2024-01-01T10:00:00Z", "old")]));
        store.insert("data/2.json", "garbage");
        store.insert(
            "data/3.json",
            page(vec![
                item("2024-01-01T11:00:00+01:00", "new"),
                item("2024-01-01T12:00:00Z", "other"),
            ]),
        );
        store.insert("data/notes.txt", "ignored");
        let reader = BatchReader::new(store, "data/");

        let ids = reader.discover().await.unwrap();
        assert_eq!(ids, vec!["data/1.json", "data/2.json", "data/3.json"]);

        let out = reader.read_batches(&ids).await.unwrap();
        assert_eq!(out.batches_read, 2);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].0, "data/2.json");
        // 11:00+01:00 is the same instant as 10:00Z
        assert_eq!(out.plays.len(), 2);
        assert_eq!(out.plays[0].track_name, "new");
        assert_eq!(out.plays[1].track_name, "other");
    }
}
