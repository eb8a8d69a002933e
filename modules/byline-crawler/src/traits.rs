// Trait seams for the crawler's collaborators.
//
// PageSource: the page-fetching capability (Browserless, plain HTTP, mocks).
// StateStore: where crawl snapshots live between runs.
// ProgressSink: where per-unit progress goes while a run is in flight.
//
// Tests swap in MockPageSource and MemoryStateStore: no network, no disk.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::FetchError;
use crate::pipeline::progress::RunProgress;
use crate::pipeline::state::CrawlSnapshot;

// ---------------------------------------------------------------------------
// PageSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Bring the capability up. Failing here aborts the run.
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Return raw markup for a URL. One attempt; retries belong to the caller.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StateStore: Send + Sync {
    /// The last saved snapshot, or `None` on first run.
    async fn load(&self) -> Result<Option<CrawlSnapshot>>;

    async fn save(&self, snapshot: &CrawlSnapshot) -> Result<()>;

    /// Drop everything. The next run starts from scratch.
    async fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &RunProgress);
}

/// Discards progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _progress: &RunProgress) {}
}

/// Streams the latest progress to any number of watchers.
impl ProgressSink for tokio::sync::watch::Sender<RunProgress> {
    fn report(&self, progress: &RunProgress) {
        self.send_replace(progress.clone());
    }
}
