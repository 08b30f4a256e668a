use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A profile tracked in the CRM, validated at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub name: String,
    pub profile_url: String,
}

/// Stats parsed from one profile page. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedStatus {
    pub id: String,
    pub name: String,
    pub badges: u64,
    pub points: u64,
    pub trails: u64,
}

/// Per-record result of a batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub id: Option<String>,
    pub success: bool,
    pub errors: Vec<String>,
}

/// One field change read back from the CRM history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub parent_name: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_at: Option<DateTime<Utc>>,
}

/// Notification color. `Info` carries no color at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Good,
    Warning,
    Danger,
    Highlight,
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Highlight => "#764FA5",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Good => write!(f, "good"),
            Self::Warning => write!(f, "warning"),
            Self::Danger => write!(f, "danger"),
            Self::Highlight => write!(f, "highlight"),
        }
    }
}

/// Stats from a sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub records_fetched: u64,
    pub scraped: u64,
    pub page_load_failed: u64,
    pub element_parse_failed: u64,
    pub scrape_exceptions: u64,
    pub crm_updated: u64,
    pub crm_update_failed: u64,
    pub history_changes: u64,
    pub csv_rows: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} scraped={} page_load_failed={} element_parse_failed={} scrape_exceptions={} crm_updated={} crm_update_failed={} history_changes={} csv_rows={}",
            self.records_fetched,
            self.scraped,
            self.page_load_failed,
            self.element_parse_failed,
            self.scrape_exceptions,
            self.crm_updated,
            self.crm_update_failed,
            self.history_changes,
            self.csv_rows,
        )
    }
}
