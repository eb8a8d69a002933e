//! The crawl loop: collect → extract → merge per source, then enrich, then
//! finalize. Strictly sequential; every progress mark is committed to the
//! state before the fetch it guards.

use std::sync::Arc;

use byline_common::{ContentRef, CrawlConfig, SourceDescriptor};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::CrawlError;
use crate::infra::Fetcher;
use crate::pipeline::collector::Collector;
use crate::pipeline::enricher::{EnrichOutcome, Enricher};
use crate::pipeline::extractor::{ExtractOutcome, Extraction, Extractor};
use crate::pipeline::finalizer::{finalize, ScrapeResult};
use crate::pipeline::merger::{self, MergeOutcome};
use crate::pipeline::progress::{RunPhase, RunProgress};
use crate::pipeline::relevance::{RelevanceFilter, SourceRelevance, Vocabulary};
use crate::pipeline::state::{CrawlSnapshot, CrawlState};
use crate::traits::{PageSource, ProgressSink, StateStore};

/// What a completed run hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub result: ScrapeResult,
    pub progress: RunProgress,
}

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    relevance: Box<dyn RelevanceFilter>,
    vocabulary: Vocabulary,
    state: CrawlState,
}

impl Crawler {
    pub fn new(config: CrawlConfig, source: Arc<dyn PageSource>) -> Self {
        let fetcher = Fetcher::new(source, config.fetch);
        let vocabulary = Vocabulary::new(&config.keywords, &config.tags);
        let relevance = Box::new(SourceRelevance::new(config.relevance));
        Self {
            config,
            fetcher,
            relevance,
            vocabulary,
            state: CrawlState::new(),
        }
    }

    /// Replace the default per-source-kind relevance rule.
    pub fn with_relevance(mut self, relevance: impl RelevanceFilter + 'static) -> Self {
        self.relevance = Box::new(relevance);
        self
    }

    /// Seed the state from a previous run.
    pub fn with_snapshot(mut self, snapshot: CrawlSnapshot) -> Self {
        self.import(snapshot);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    // --- State ---

    pub fn import(&mut self, snapshot: CrawlSnapshot) {
        self.state.import(snapshot, self.config.sample_cap);
    }

    pub fn export(&self) -> CrawlSnapshot {
        self.state.export()
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn forget_profile(&mut self, handle: &str) -> bool {
        self.state.forget_profile(handle)
    }

    // --- Single steps ---

    pub async fn collect(&mut self, source: &SourceDescriptor) -> Vec<ContentRef> {
        Collector::new(&self.fetcher, &self.config)
            .collect(source, &mut self.state)
            .await
    }

    pub async fn extract(&mut self, content_ref: &ContentRef) -> ExtractOutcome {
        Extractor::new(&self.config.site, &self.vocabulary, self.relevance.as_ref())
            .extract(&self.fetcher, content_ref, &mut self.state)
            .await
    }

    pub fn merge(&mut self, extraction: &Extraction) -> MergeOutcome {
        merger::merge(&mut self.state, extraction, self.config.sample_cap)
    }

    pub async fn enrich_profile(&mut self, handle: &str) -> EnrichOutcome {
        Enricher::new(&self.fetcher, &self.config)
            .enrich(handle, &mut self.state)
            .await
    }

    pub fn finalize(&self, run: &RunProgress) -> ScrapeResult {
        finalize(&self.state, run)
    }

    // --- Full runs ---

    /// One full run against the in-memory state. The caller exports the
    /// state afterwards, whether the run succeeded or not.
    pub async fn run(&mut self, sink: &dyn ProgressSink) -> Result<RunOutcome, CrawlError> {
        self.run_inner(None, sink).await
    }

    /// Load from the store, run, checkpoint along the way, and save at the end.
    /// State is saved on initialization failure too.
    pub async fn run_with_store(
        &mut self,
        store: &dyn StateStore,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, CrawlError> {
        if let Some(snapshot) = store.load().await.map_err(CrawlError::Store)? {
            self.import(snapshot);
        }
        self.run_inner(Some(store), sink).await
    }

    async fn run_inner(
        &mut self,
        store: Option<&dyn StateStore>,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, CrawlError> {
        let mut progress = RunProgress::start(Utc::now());
        sink.report(&progress);

        let source_name = self.fetcher.source().name().to_string();
        if let Err(e) = self.fetcher.source().start().await {
            error!(source = %source_name, error = %e, "Page source failed to start, aborting run");
            progress.finish(RunPhase::Failed, Utc::now());
            sink.report(&progress);
            if let Some(store) = store {
                store.save(&self.export()).await.map_err(CrawlError::Store)?;
            }
            return Err(CrawlError::Initialization {
                source_name,
                reason: format!("{e:#}"),
            });
        }

        // Phase 1: sources in order; each ref is extracted and merged as it arrives
        progress.phase = RunPhase::Collecting;
        let sources = self.config.sources();
        progress.sources_total = sources.len() as u32;
        info!(sources = sources.len(), source = %source_name, "Run started");

        let mut since_checkpoint = 0;
        for source in &sources {
            let refs = self.collect(source).await;
            progress.refs_collected += refs.len() as u32;

            for content_ref in &refs {
                match self.extract(content_ref).await {
                    ExtractOutcome::AlreadyProcessed => progress.urls_skipped += 1,
                    ExtractOutcome::Extracted(extraction) => {
                        progress.urls_processed += 1;
                        match self.merge(&extraction) {
                            MergeOutcome::Created => progress.authors_created += 1,
                            MergeOutcome::Updated => progress.authors_updated += 1,
                        }
                    }
                    ExtractOutcome::NoAuthor => {
                        progress.urls_processed += 1;
                        progress.no_author += 1;
                    }
                    ExtractOutcome::Irrelevant => {
                        progress.urls_processed += 1;
                        progress.irrelevant += 1;
                    }
                    ExtractOutcome::FetchFailed(_) => {
                        progress.urls_processed += 1;
                        progress.fetch_failures += 1;
                    }
                }
                sink.report(&progress);
                self.maybe_checkpoint(store, &mut since_checkpoint).await;
            }

            progress.sources_done += 1;
            sink.report(&progress);
        }

        // Phase 2: enrich profiles not yet attempted
        progress.phase = RunPhase::Enriching;
        let pending = Enricher::new(&self.fetcher, &self.config).pending(&self.state);
        progress.profiles_total = pending.len() as u32;
        sink.report(&progress);

        for handle in &pending {
            match self.enrich_profile(handle).await {
                EnrichOutcome::Enriched { fields_filled } => {
                    progress.profiles_processed += 1;
                    progress.fields_filled += fields_filled as u32;
                }
                EnrichOutcome::FetchFailed(_) => {
                    progress.profiles_processed += 1;
                    progress.profiles_failed += 1;
                }
                EnrichOutcome::Skipped => {}
            }
            sink.report(&progress);
            self.maybe_checkpoint(store, &mut since_checkpoint).await;
        }

        // Phase 3: save and finalize
        progress.finish(RunPhase::Finished, Utc::now());
        if let Some(store) = store {
            store.save(&self.export()).await.map_err(CrawlError::Store)?;
        }
        sink.report(&progress);

        let result = self.finalize(&progress);
        info!(
            authors = result.stats.total_authors,
            new = result.stats.new_this_run,
            urls = progress.urls_processed,
            profiles = progress.profiles_processed,
            failures = progress.failures(),
            duration_ms = progress.duration_ms(),
            "Run complete"
        );
        Ok(RunOutcome { result, progress })
    }

    /// Save every `checkpoint_every` units. A failed checkpoint is logged; the
    /// final save still has to succeed.
    async fn maybe_checkpoint(&self, store: Option<&dyn StateStore>, since: &mut usize) {
        let Some(store) = store else {
            return;
        };
        if self.config.checkpoint_every == 0 {
            return;
        }
        *since += 1;
        if *since < self.config.checkpoint_every {
            return;
        }
        *since = 0;
        if let Err(e) = store.save(&self.export()).await {
            warn!(error = %e, "Checkpoint save failed");
        }
    }
}
