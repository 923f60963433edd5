use crate::app::ports::{ArtistLookup, ArtistMetadata};
use crate::config::MetadataConfig;
use crate::constants::UNKNOWN_GENRE;
use crate::error::{PipelineError, Result};
use crate::metrics::GenreMetrics;
use crate::pipeline::genre_cache::GenreMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(crate::constants::DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &MetadataConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX)
    }
}

/// Join genres in service order, or "Unknown" when there are none.
pub fn genre_label(genres: &[String]) -> String {
    if genres.is_empty() {
        UNKNOWN_GENRE.to_string()
    } else {
        genres.join(", ")
    }
}

/// Resolves genres for artists the cache does not know yet.
pub struct GenreResolver {
    metadata: Arc<dyn ArtistMetadata>,
    policy: RetryPolicy,
}

impl GenreResolver {
    pub fn new(metadata: Arc<dyn ArtistMetadata>, policy: RetryPolicy) -> Self {
        Self { metadata, policy }
    }

    /// Every input uri gets an entry; per-artist failures are recorded as
    /// "Unknown". A rejected credential aborts the whole resolution.
    pub async fn resolve_genres(&self, artist_uris: &[String], token: &str) -> Result<GenreMap> {
        let mut resolved = GenreMap::new();
        for uri in artist_uris {
            let genre = self.resolve_one(uri, token).await?;
            resolved.insert(uri.clone(), genre);
        }
        let unknown = resolved.values().filter(|g| *g == UNKNOWN_GENRE).count();
        info!(
            artists = artist_uris.len(),
            unknown,
            "Resolved genres for uncached artists"
        );
        Ok(resolved)
    }

    async fn resolve_one(&self, artist_uri: &str, token: &str) -> Result<String> {
        let mut attempt = 1u32;
        loop {
            match self.metadata.fetch_artist(artist_uri, token).await {
                Ok(ArtistLookup::Found { genres }) => {
                    debug!(artist_uri, attempt, genres = genres.len(), "Artist resolved");
                    if genres.is_empty() {
                        GenreMetrics::record_unknown("no_genres");
                    } else {
                        GenreMetrics::record_resolved();
                    }
                    return Ok(genre_label(&genres));
                }
                Ok(ArtistLookup::Absent) => {
                    debug!(artist_uri, "Artist not known to metadata service");
                    GenreMetrics::record_unknown("absent");
                    return Ok(UNKNOWN_GENRE.to_string());
                }
                Err(e) if !e.is_retryable() => {
                    error!(artist_uri, error = %e, "Metadata service rejected the token");
                    return Err(PipelineError::Auth(e.to_string()));
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let backoff = self.policy.delay_after(attempt);
                    warn!(
                        artist_uri,
                        attempt,
                        error = %e,
                        ?backoff,
                        "Artist lookup failed, retrying"
                    );
                    GenreMetrics::record_retry();
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(artist_uri, attempt, error = %e, "Artist lookup failed, recording Unknown");
                    GenreMetrics::record_unknown("retries_exhausted");
                    return Ok(UNKNOWN_GENRE.to_string());
                }
            }
        }
    }
}
