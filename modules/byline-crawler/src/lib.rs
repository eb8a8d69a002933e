pub mod crawler;
pub mod error;
pub mod infra;
pub mod pipeline;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use crawler::{Crawler, RunOutcome};
pub use error::{CrawlError, FetchError};
pub use pipeline::finalizer::{AuthorRecord, ScrapeResult};
pub use pipeline::progress::{RunPhase, RunProgress};
pub use pipeline::state::{CrawlSnapshot, CrawlState};
pub use pipeline::stats::ScrapeStats;
