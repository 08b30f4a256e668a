// In-memory doubles for the sync run.
//
// - MockRecordStore (RecordStore): fixed records, toggled failures, logged updates
// - ScriptedBrowser (BrowserLauncher + ProfileBrowser): per-URL read scripts
// - RecordingNotifier (NotifyBackend): keeps every notification it is handed
//
// All three are Clone and share their state, so a test keeps one handle
// for assertions and boxes the other into the run.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{Config, CrmSettings, PollBudget};
use crate::messages::Locale;
use crate::notify::backend::NotifyBackend;
use crate::notify::{Notification, Notifier};
use crate::scrape::{HEADING_SELECTOR, MARKER_SELECTOR};
use crate::traits::{BrowserLauncher, ProfileBrowser, ProfilePage, RecordStore};
use crate::types::{HistoryEntry, ScrapedStatus, SourceRecord, UpdateOutcome};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn source_record(id: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        name: format!("Trailblazer {id}"),
        profile_url: profile_url(id),
    }
}

pub fn profile_url(id: &str) -> String {
    format!("https://trailblazer.example/id/{id}")
}

/// Marker text with the full eight lines.
pub fn rank_text(badges: &str, points: &str, trails: &str) -> String {
    format!("Badges\n{badges}\nPoints\n{points}\nTrails\n{trails}\nRank\nRanger")
}

/// Config with no sleeps, no Slack and the CSV under `csv_dir`.
pub fn test_config(csv_dir: &Path, max_polls: u32) -> Config {
    Config {
        locale: Locale::En,
        log_directory: None,
        log_max_files: 30,
        crm: CrmSettings {
            login_url: "https://login.example".to_string(),
            api_version: "59.0".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            username: "user@example.com".to_string(),
            password: "password".to_string(),
            should_update: true,
            should_export_history: false,
            history_window_minutes: 5,
        },
        poll: PollBudget {
            interval: Duration::ZERO,
            max_polls,
        },
        chrome_bin: None,
        csv_path: csv_dir.join("trailblazers.csv"),
        slack: None,
    }
}

// ---------------------------------------------------------------------------
// MockRecordStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    records: Vec<SourceRecord>,
    history: Vec<HistoryEntry>,
    rejected_ids: HashSet<String>,
    fail_auth: bool,
    fail_query: bool,
    fail_update: bool,
    fail_history: bool,
    authenticated: bool,
    update_batches: Vec<Vec<ScrapedStatus>>,
    history_queries: Vec<DateTime<Utc>>,
}

/// Record store with canned data. Builder pattern:
/// `.with_records()`, `.with_history()`, `.reject()`, `.failing_*()`.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, records: Vec<SourceRecord>) -> Self {
        self.state.lock().unwrap().records = records;
        self
    }

    pub fn with_history(self, history: Vec<HistoryEntry>) -> Self {
        self.state.lock().unwrap().history = history;
        self
    }

    /// Report an unsuccessful outcome for `id` in every update.
    pub fn reject(self, id: &str) -> Self {
        self.state.lock().unwrap().rejected_ids.insert(id.to_string());
        self
    }

    pub fn failing_auth(self) -> Self {
        self.state.lock().unwrap().fail_auth = true;
        self
    }

    pub fn failing_query(self) -> Self {
        self.state.lock().unwrap().fail_query = true;
        self
    }

    pub fn failing_update(self) -> Self {
        self.state.lock().unwrap().fail_update = true;
        self
    }

    pub fn failing_history(self) -> Self {
        self.state.lock().unwrap().fail_history = true;
        self
    }

    /// Every batch passed to `update_statuses`, in call order.
    pub fn update_batches(&self) -> Vec<Vec<ScrapedStatus>> {
        self.state.lock().unwrap().update_batches.clone()
    }

    pub fn history_queries(&self) -> Vec<DateTime<Utc>> {
        self.state.lock().unwrap().history_queries.clone()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn authenticate(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_auth {
            bail!("INVALID_LOGIN: authentication failure");
        }
        state.authenticated = true;
        Ok(())
    }

    async fn fetch_records(&self) -> Result<Vec<SourceRecord>> {
        let state = self.state.lock().unwrap();
        if !state.authenticated {
            bail!("not authenticated");
        }
        if state.fail_query {
            bail!("MALFORMED_QUERY: unexpected token");
        }
        Ok(state.records.clone())
    }

    async fn update_statuses(&self, statuses: &[ScrapedStatus]) -> Result<Vec<UpdateOutcome>> {
        let mut state = self.state.lock().unwrap();
        state.update_batches.push(statuses.to_vec());
        if state.fail_update {
            bail!("REQUEST_LIMIT_EXCEEDED: too many requests");
        }
        Ok(statuses
            .iter()
            .map(|s| {
                if state.rejected_ids.contains(&s.id) {
                    UpdateOutcome {
                        id: None,
                        success: false,
                        errors: vec!["ENTITY_IS_DELETED: entity is deleted".to_string()],
                    }
                } else {
                    UpdateOutcome {
                        id: Some(s.id.clone()),
                        success: true,
                        errors: vec![],
                    }
                }
            })
            .collect())
    }

    async fn recent_history(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>> {
        let mut state = self.state.lock().unwrap();
        state.history_queries.push(since);
        if state.fail_history {
            bail!("INVALID_FIELD: No such column");
        }
        Ok(state.history.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedBrowser
// ---------------------------------------------------------------------------

/// What one profile URL does when visited.
#[derive(Clone, Debug, Default)]
pub struct PageScript {
    /// `goto` fails with this message.
    pub navigation_error: Option<String>,
    /// Successive marker read results; the last one repeats.
    pub reads: Vec<Option<String>>,
    pub heading: Option<String>,
}

impl PageScript {
    /// A profile that renders the full marker on the first read.
    pub fn loaded(name: &str, badges: &str, points: &str, trails: &str) -> Self {
        Self {
            navigation_error: None,
            reads: vec![Some(rank_text(badges, points, trails))],
            heading: Some(name.to_string()),
        }
    }

    pub fn navigation_fails(message: &str) -> Self {
        Self {
            navigation_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_reads(reads: Vec<Option<String>>, heading: Option<&str>) -> Self {
        Self {
            navigation_error: None,
            reads,
            heading: heading.map(String::from),
        }
    }
}

#[derive(Default)]
struct BrowserState {
    scripts: HashMap<String, PageScript>,
    fail_launch: bool,
    sessions_launched: usize,
    sessions_closed: usize,
    pages_opened: usize,
    pages_closed: usize,
    marker_reads: HashMap<String, usize>,
}

/// Browser whose pages replay per-URL scripts. Unscripted URLs fail to navigate.
#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(self, url: &str, script: PageScript) -> Self {
        self.state.lock().unwrap().scripts.insert(url.to_string(), script);
        self
    }

    pub fn failing_launch(self) -> Self {
        self.state.lock().unwrap().fail_launch = true;
        self
    }

    pub fn sessions_launched(&self) -> usize {
        self.state.lock().unwrap().sessions_launched
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().unwrap().sessions_closed
    }

    pub fn pages_opened(&self) -> usize {
        self.state.lock().unwrap().pages_opened
    }

    pub fn pages_closed(&self) -> usize {
        self.state.lock().unwrap().pages_closed
    }

    /// Marker reads issued against `url` across all pages.
    pub fn marker_reads(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .marker_reads
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedBrowser {
    async fn launch(&self) -> Result<Box<dyn ProfileBrowser>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            bail!("Failed to launch the browser process");
        }
        state.sessions_launched += 1;
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ProfileBrowser for ScriptedBrowser {
    async fn open_page(&self) -> Result<Box<dyn ProfilePage>> {
        self.state.lock().unwrap().pages_opened += 1;
        Ok(Box::new(ScriptedPage {
            state: self.state.clone(),
            url: None,
            script: PageScript::default(),
            read: 0,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().sessions_closed += 1;
        Ok(())
    }
}

struct ScriptedPage {
    state: Arc<Mutex<BrowserState>>,
    url: Option<String>,
    script: PageScript,
    read: usize,
}

#[async_trait]
impl ProfilePage for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let script = match self.state.lock().unwrap().scripts.get(url) {
            Some(script) => script.clone(),
            None => bail!("net::ERR_NAME_NOT_RESOLVED at {url}"),
        };
        if let Some(ref message) = script.navigation_error {
            bail!("{message}");
        }
        self.url = Some(url.to_string());
        self.script = script;
        self.read = 0;
        Ok(())
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>> {
        let Some(ref url) = self.url else {
            bail!("page has not navigated");
        };
        match selector {
            MARKER_SELECTOR => {
                *self
                    .state
                    .lock()
                    .unwrap()
                    .marker_reads
                    .entry(url.clone())
                    .or_default() += 1;
                let reads = &self.script.reads;
                let result = reads
                    .get(self.read)
                    .or_else(|| reads.last())
                    .cloned()
                    .flatten();
                self.read += 1;
                Ok(result)
            }
            HEADING_SELECTOR => Ok(self.script.heading.clone()),
            _ => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().pages_closed += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Keeps every notification in send order. `.failing()` makes every send
/// error after recording.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(Box::new(self.clone()))
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyBackend for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            bail!("channel_not_found");
        }
        Ok(())
    }
}
