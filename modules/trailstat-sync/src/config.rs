use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::messages::Locale;

const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
const DEFAULT_API_VERSION: &str = "59.0";
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const DEFAULT_PAGE_LOAD_WAIT_MS: u64 = 30_000;
const DEFAULT_HISTORY_WINDOW_MINUTES: i64 = 5;
const DEFAULT_LOG_MAX_FILES: usize = 30;

/// Sleep between marker reads, and how many reads a profile gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_polls: u32,
}

#[derive(Debug, Clone)]
pub struct CrmSettings {
    pub login_url: String,
    pub api_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub should_update: bool,
    pub should_export_history: bool,
    pub history_window_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub token: String,
    pub channel_id: String,
    pub user_name: String,
}

/// Run configuration loaded from environment variables (and `.env`).
/// Read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub locale: Locale,
    pub log_directory: Option<PathBuf>,
    /// Daily log files kept in `log_directory`; older ones are pruned.
    pub log_max_files: usize,
    pub crm: CrmSettings,
    pub poll: PollBudget,
    pub chrome_bin: Option<String>,
    pub csv_path: PathBuf,
    /// `None` when Slack notifications are disabled.
    pub slack: Option<SlackSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow!("{key} environment variable is required"))
        };
        let flag = |key: &str| -> Result<bool> {
            match var(key) {
                Some(v) => parse_flag(&v).with_context(|| format!("{key} must be a boolean")),
                None => Ok(false),
            }
        };

        let locale = match var("LOCALE") {
            Some(v) => v.parse::<Locale>().map_err(|e| anyhow!("LOCALE: {e}"))?,
            None => Locale::default(),
        };

        let crm = CrmSettings {
            login_url: var("CRM_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            api_version: var("CRM_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            client_id: required("CRM_CLIENT_ID")?,
            client_secret: required("CRM_CLIENT_SECRET")?,
            username: required("CRM_USERNAME")?,
            password: required("CRM_PASSWORD")?,
            should_update: flag("CRM_SHOULD_UPDATE")?,
            should_export_history: flag("CRM_SHOULD_EXPORT_HISTORY")?,
            history_window_minutes: match var("CRM_HISTORY_WINDOW_MINUTES") {
                Some(v) => v.parse().context("CRM_HISTORY_WINDOW_MINUTES must be a number")?,
                None => DEFAULT_HISTORY_WINDOW_MINUTES,
            },
        };

        let interval_ms: u64 = match var("SCRAPE_POLL_INTERVAL_MS") {
            Some(v) => v.parse().context("SCRAPE_POLL_INTERVAL_MS must be a number")?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        let max_polls = match var("SCRAPE_MAX_POLLS") {
            Some(v) => v.parse().context("SCRAPE_MAX_POLLS must be a number")?,
            None => {
                let wait_ms: u64 = match var("SCRAPE_PAGE_LOAD_WAIT_MS") {
                    Some(v) => v.parse().context("SCRAPE_PAGE_LOAD_WAIT_MS must be a number")?,
                    None => DEFAULT_PAGE_LOAD_WAIT_MS,
                };
                derive_max_polls(wait_ms, interval_ms)
            }
        };

        let csv_directory =
            PathBuf::from(var("CSV_DIRECTORY").unwrap_or_else(|| "data".to_string()));
        let csv_file_name = var("CSV_FILE_NAME").unwrap_or_else(|| "trailblazers".to_string());

        let slack = if flag("SLACK_SHOULD_SEND_MESSAGE")? {
            Some(SlackSettings {
                token: required("SLACK_TOKEN")?,
                channel_id: required("SLACK_CHANNEL_ID")?,
                user_name: var("SLACK_USER_NAME").unwrap_or_else(|| "trailstat".to_string()),
            })
        } else {
            None
        };

        let log_max_files: usize = match var("LOG_MAX_FILES") {
            Some(v) => v.parse().context("LOG_MAX_FILES must be a number")?,
            None => DEFAULT_LOG_MAX_FILES,
        };
        if log_max_files == 0 {
            return Err(anyhow!("LOG_MAX_FILES must be at least 1"));
        }

        Ok(Self {
            locale,
            log_directory: var("LOG_DIRECTORY").map(PathBuf::from),
            log_max_files,
            crm,
            poll: PollBudget {
                interval: Duration::from_millis(interval_ms),
                max_polls,
            },
            chrome_bin: var("CHROME_BIN"),
            csv_path: csv_directory.join(format!("{csv_file_name}.csv")),
            slack,
        })
    }

    pub fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().count().min(5);
            let head: String = val.chars().take(n).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  LOCALE: {:?}", self.locale);
        tracing::info!("  CRM_LOGIN_URL: {}", self.crm.login_url);
        tracing::info!("  CRM_USERNAME: {}", self.crm.username);
        tracing::info!("  CRM_CLIENT_ID: {}", preview(&self.crm.client_id));
        tracing::info!("  CRM_SHOULD_UPDATE: {}", self.crm.should_update);
        tracing::info!("  CRM_SHOULD_EXPORT_HISTORY: {}", self.crm.should_export_history);
        tracing::info!(
            "  POLL: interval={}ms max_polls={}",
            self.poll.interval.as_millis(),
            self.poll.max_polls
        );
        tracing::info!("  CSV: {}", self.csv_path.display());
        match &self.log_directory {
            Some(dir) => tracing::info!(
                "  LOG_DIRECTORY: {} (keeps {} files)",
                dir.display(),
                self.log_max_files
            ),
            None => tracing::info!("  LOG_DIRECTORY: <stdout only>"),
        }
        match &self.slack {
            Some(slack) => tracing::info!(
                "  SLACK: channel={} token={}",
                slack.channel_id,
                preview(&slack.token)
            ),
            None => tracing::info!("  SLACK: <disabled>"),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("unrecognized boolean '{other}'")),
    }
}

/// Number of reads that fit in `wait_ms`, at least one.
fn derive_max_polls(wait_ms: u64, interval_ms: u64) -> u32 {
    if interval_ms == 0 {
        return 1;
    }
    (wait_ms / interval_ms).clamp(1, u32::MAX as u64) as u32
}
