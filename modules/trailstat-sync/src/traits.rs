// Trait boundaries for the sync run.
//
// RecordStore: reads targets from the CRM, writes stats back, reads history.
// BrowserLauncher: starts one ProfileBrowser session per run.
// ProfileBrowser: hands out one ProfilePage per record.
// ProfilePage: navigates one profile and reads element text.
//
// Test doubles for all of them live in `testing`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{HistoryEntry, ScrapedStatus, SourceRecord, UpdateOutcome};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Establish a session. Called once before any other method.
    async fn authenticate(&self) -> Result<()>;

    /// All target records, every page of the result concatenated in source order.
    async fn fetch_records(&self) -> Result<Vec<SourceRecord>>;

    /// Write scraped stats back as one batch. `Err` only when the batch as a
    /// whole failed; per-item failures come back as unsuccessful outcomes.
    async fn update_statuses(&self, statuses: &[ScrapedStatus]) -> Result<Vec<UpdateOutcome>>;

    /// Badge changes recorded at or after `since`, newest first.
    async fn recent_history(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ProfileBrowser>>;
}

#[async_trait]
pub trait ProfileBrowser: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn ProfilePage>>;

    /// Shut the session down. Pages must already be closed.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait ProfilePage: Send + Sync {
    /// Navigate and wait until network activity settles.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Text content of the first element matching `selector`, `None` if absent.
    async fn text_of(&mut self, selector: &str) -> Result<Option<String>>;

    async fn close(&mut self) -> Result<()>;
}
