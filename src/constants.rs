/// Storage keys and defaults shared across the pipeline.
/// These match the layout the capture job and the dashboard already use.

// Raw batches written by the capture job
pub const DEFAULT_BATCH_PREFIX: &str = "data/";
pub const BATCH_EXTENSIONS: &[&str] = &[".json", ".ndjson"];

// Internal state kept next to the raw batches
pub const DEFAULT_SEEN_KEY: &str = "internal/seen_s3_keys.json";
pub const DEFAULT_GENRE_CACHE_KEY: &str = "internal/genre_cache.json";

// Output consumed by the dashboard
pub const DEFAULT_DATASET_KEY: &str = "processed/listening_data.csv";

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_ENV: &str = "LISTENING_API_TOKEN";

/// Genre label recorded when an artist cannot be resolved or lists no genres.
pub const UNKNOWN_GENRE: &str = "Unknown";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Returns true when a storage key names a raw batch under `prefix`.
pub fn is_batch_key(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix) && BATCH_EXTENSIONS.iter().any(|ext| key.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_batch_key() {
        assert!(is_batch_key("data/2024-01-01.json", "data/"));
        assert!(is_batch_key("data/nested/a.ndjson", "data/"));
        assert!(!is_batch_key("data/readme.txt", "data/"));
        assert!(!is_batch_key("internal/genre_cache.json", "data/"));
    }
}
