use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Starting,
    Collecting,
    Enriching,
    Finished,
    Failed,
}

/// Live counters for one run. Pushed to the `ProgressSink` after every unit
/// and returned with the run outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub phase: RunPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    // Collection
    pub sources_total: u32,
    pub sources_done: u32,
    pub refs_collected: u32,

    // Extraction
    pub urls_processed: u32,
    pub urls_skipped: u32,
    pub fetch_failures: u32,
    pub no_author: u32,
    pub irrelevant: u32,
    pub authors_created: u32,
    pub authors_updated: u32,

    // Enrichment
    pub profiles_total: u32,
    pub profiles_processed: u32,
    pub profiles_failed: u32,
    pub fields_filled: u32,
}

impl RunProgress {
    pub fn start(at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(at),
            ..Self::default()
        }
    }

    pub fn finish(&mut self, phase: RunPhase, at: DateTime<Utc>) {
        self.phase = phase;
        self.finished_at = Some(at);
    }

    /// Wall time between the recorded start and finish, 0 while running.
    pub fn duration_ms(&self) -> u64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    /// Units that failed: content fetches plus profile fetches.
    pub fn failures(&self) -> u32 {
        self.fetch_failures + self.profiles_failed
    }
}
