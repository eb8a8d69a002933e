pub mod file;

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::state::CrawlSnapshot;
use crate::traits::StateStore;

pub use file::JsonFileStateStore;

/// In-process store. Holds the last saved snapshot and counts saves.
#[derive(Default)]
pub struct MemoryStateStore {
    snapshot: Mutex<Option<CrawlSnapshot>>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CrawlSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<CrawlSnapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<CrawlSnapshot>> {
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &CrawlSnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
