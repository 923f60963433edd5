use crate::app::ports::{ArtistMetadata, CredentialProvider, ObjectStore};
use crate::config::PipelineConfig;
use crate::constants::UNKNOWN_GENRE;
use crate::error::Result;
use crate::infra::{FsObjectStore, ReqwestArtistClient};
use crate::metrics::{BatchMetrics, GenreMetrics, RunMetrics};
use crate::pipeline::batch_reader::BatchReader;
use crate::pipeline::dataset::DatasetStore;
use crate::pipeline::genre_cache::{GenreCache, GenreMap};
use crate::pipeline::genre_resolver::{GenreResolver, RetryPolicy};
use crate::pipeline::merge::merge;
use crate::pipeline::seen::SeenBatchTracker;
use crate::types::{PlayEvent, RunOutcome};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Runs one linear pass: new batches -> flatten -> enrich -> merge -> persist.
pub struct Orchestrator {
    seen: SeenBatchTracker,
    reader: BatchReader,
    genre_cache: GenreCache,
    resolver: GenreResolver,
    dataset: DatasetStore,
    credentials: Arc<dyn CredentialProvider>,
}

impl Orchestrator {
    pub fn new(
        config: &PipelineConfig,
        source: Arc<dyn ObjectStore>,
        dest: Arc<dyn ObjectStore>,
        metadata: Arc<dyn ArtistMetadata>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let storage = &config.storage;
        Self {
            seen: SeenBatchTracker::new(source.clone(), storage.seen_key.clone()),
            reader: BatchReader::new(source.clone(), storage.batch_prefix.clone()),
            genre_cache: GenreCache::new(source, storage.genre_cache_key.clone()),
            resolver: GenreResolver::new(metadata, RetryPolicy::from_config(&config.metadata)),
            dataset: DatasetStore::new(dest, storage.dataset_key.clone()),
            credentials,
        }
    }

    /// Filesystem stores and the HTTP metadata client, as configured.
    pub fn from_config(
        config: &PipelineConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let source = Arc::new(FsObjectStore::new(&config.storage.source_root));
        let dest = Arc::new(FsObjectStore::new(&config.storage.dest_root));
        let metadata = Arc::new(ReqwestArtistClient::new(
            &config.metadata.api_base,
            config.metadata.request_timeout(),
        )?);
        Ok(Self::new(config, source, dest, metadata, credentials))
    }

    /// Batch ids that the next run would pick up. Touches no store.
    pub async fn pending(&self) -> Result<Vec<String>> {
        let seen = self.seen.load().await?;
        let all = self.reader.discover().await?;
        Ok(SeenBatchTracker::filter_new(&all, &seen))
    }

    /// Never fails: fatal errors are logged and reported as `failed`.
    pub async fn invoke(&self) -> RunOutcome {
        let started = Instant::now();
        let outcome = match self.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    error = %e,
                    kind = e.kind(),
                    fatal = e.is_fatal(),
                    "Pipeline run failed"
                );
                RunMetrics::record_failure(e.kind());
                RunOutcome::failed()
            }
        };
        RunMetrics::record_finished(
            outcome.status,
            outcome.rows,
            started.elapsed().as_secs_f64(),
        );
        outcome
    }

    #[instrument(name = "pipeline_run", skip(self))]
    pub async fn run(&self) -> Result<RunOutcome> {
        // 1. Which batches are new
        let mut seen = self.seen.load().await?;
        let all = self.reader.discover().await?;
        let new_ids = SeenBatchTracker::filter_new(&all, &seen);
        BatchMetrics::record_discovered(new_ids.len());

        // 2. Nothing new: leave every store alone
        if new_ids.is_empty() {
            info!(known = seen.len(), "No new batches");
            return Ok(RunOutcome::noop());
        }
        info!(new = new_ids.len(), known = seen.len(), "Found new batches");

        // 3. Flatten
        let read = self.reader.read_batches(&new_ids).await?;
        if read.plays.is_empty() {
            // Mark them anyway so malformed batches are not retried forever
            info!(
                skipped = read.skipped.len(),
                "New batches yielded no plays"
            );
            seen.extend(new_ids);
            self.seen.save(&seen).await?;
            return Ok(RunOutcome::noop());
        }

        // 4. Date and hour
        let mut events: Vec<PlayEvent> = read.plays.into_iter().map(|p| p.into_event()).collect();

        // Load the remaining durable state before calling out to the metadata service
        let existing = self.dataset.load().await?;
        let cache = self.genre_cache.load().await?;

        // 5. Genres
        let missing = GenreCache::missing(&cache, events.iter().map(|e| e.artist_uri.as_str()));
        let cached_artists: BTreeSet<&str> = events
            .iter()
            .map(|e| e.artist_uri.as_str())
            .filter(|uri| cache.contains_key(*uri))
            .collect();
        GenreMetrics::record_cache_hits(cached_artists.len());
        let fresh = if missing.is_empty() {
            GenreMap::new()
        } else {
            let token = self.credentials.token().await?;
            self.resolver.resolve_genres(&missing, &token).await?
        };
        let cache_changed = !fresh.is_empty();
        let cache = GenreCache::merge(cache, fresh);
        for event in &mut events {
            event.genre = cache
                .get(&event.artist_uri)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_GENRE.to_string());
        }

        // 6. Merge
        let previous_rows = existing.as_ref().map_or(0, Vec::len);
        let new_count = events.len();
        let merged = merge(existing.unwrap_or_default(), events);

        // 7. Persist; the seen set goes last so a crash never hides unsaved data
        self.dataset.save(&merged).await?;
        if cache_changed {
            self.genre_cache.save(&cache).await?;
        }
        seen.extend(new_ids);
        self.seen.save(&seen).await?;

        info!(
            previous_rows,
            new_events = new_count,
            rows = merged.len(),
            "Run complete"
        );
        Ok(RunOutcome::ok(merged.len()))
    }
}
