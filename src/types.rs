use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the cumulative dataset file.
pub const DATASET_COLUMNS: &[&str] = &[
    "played_at",
    "track_name",
    "track_uri",
    "artist_name",
    "artist_uri",
    "album_name",
    "album_uri",
    "duration_ms",
    "explicit",
    "context_type",
    "context_uri",
    "played_at_local",
    "derived_date",
    "derived_hour",
    "genre",
];

/// A play flattened out of a raw batch, before time fields and genre are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlay {
    pub played_at: String,
    pub played_at_local: DateTime<FixedOffset>,
    pub track_name: String,
    pub track_uri: String,
    pub artist_name: String,
    pub artist_uri: String,
    pub album_name: String,
    pub album_uri: String,
    pub duration_ms: u64,
    pub explicit: bool,
    pub context_type: Option<String>,
    pub context_uri: Option<String>,
}

impl ParsedPlay {
    /// Dedup key: the instant of the play, independent of how the offset was written.
    pub fn instant(&self) -> DateTime<Utc> {
        self.played_at_local.with_timezone(&Utc)
    }

    /// Derive date and hour from the play time. Genre is left empty.
    pub fn into_event(self) -> PlayEvent {
        let utc = self.instant();
        PlayEvent {
            played_at: self.played_at,
            track_name: self.track_name,
            track_uri: self.track_uri,
            artist_name: self.artist_name,
            artist_uri: self.artist_uri,
            album_name: self.album_name,
            album_uri: self.album_uri,
            duration_ms: self.duration_ms,
            explicit: self.explicit,
            context_type: self.context_type,
            context_uri: self.context_uri,
            played_at_local: self.played_at_local,
            derived_date: utc.date_naive(),
            derived_hour: utc.hour(),
            genre: String::new(),
        }
    }
}

/// One row of the cumulative dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub played_at: String,
    pub track_name: String,
    pub track_uri: String,
    pub artist_name: String,
    pub artist_uri: String,
    pub album_name: String,
    pub album_uri: String,
    pub duration_ms: u64,
    pub explicit: bool,
    pub context_type: Option<String>,
    pub context_uri: Option<String>,
    pub played_at_local: DateTime<FixedOffset>,
    pub derived_date: NaiveDate,
    pub derived_hour: u32,
    pub genre: String,
}

impl PlayEvent {
    pub fn instant(&self) -> DateTime<Utc> {
        self.played_at_local.with_timezone(&Utc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Noop,
    Ok,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Noop => "noop",
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
        }
    }
}

/// Result of one invocation, as reported to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub rows: usize,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn noop() -> Self {
        Self { rows: 0, status: RunStatus::Noop }
    }

    pub fn ok(rows: usize) -> Self {
        Self { rows, status: RunStatus::Ok }
    }

    pub fn failed() -> Self {
        Self { rows: 0, status: RunStatus::Failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_event_derives_utc_date_and_hour() {
        let local = DateTime::parse_from_rfc3339("2024-01-01T01:30:00+03:00").unwrap();
        let play = ParsedPlay {
            played_at: "2024-01-01T01:30:00+03:00".to_string(),
            played_at_local: local,
            track_name: "Song".to_string(),
            track_uri: "spotify:track:1".to_string(),
            artist_name: "Band".to_string(),
            artist_uri: "spotify:artist:1".to_string(),
            album_name: "Record".to_string(),
            album_uri: "spotify:album:1".to_string(),
            duration_ms: 1000,
            explicit: false,
            context_type: None,
            context_uri: None,
        };

        let event = play.into_event();
        assert_eq!(event.derived_date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(event.derived_hour, 22);
        assert!(event.genre.is_empty());
    }

    #[test]
    fn test_run_outcome_serializes_lowercase_status() {
        let json = serde_json::to_string(&RunOutcome::ok(3)).unwrap();
        assert_eq!(json, r#"{"rows":3,"status":"ok"}"#);
        let json = serde_json::to_string(&RunOutcome::noop()).unwrap();
        assert_eq!(json, r#"{"rows":0,"status":"noop"}"#);
    }
}
