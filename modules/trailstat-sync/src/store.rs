use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use crm_client::{CrmClient, LoginOptions, SaveResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::CrmSettings;
use crate::traits::RecordStore;
use crate::types::{HistoryEntry, ScrapedStatus, SourceRecord, UpdateOutcome};

const SOBJECT: &str = "Trailblazer__c";
const RECORD_QUERY: &str = "SELECT Id, Name, Profile_Link__c FROM Trailblazer__c";

/// Trailblazer row as the CRM returns it; validated into [`SourceRecord`].
#[derive(Debug, Deserialize)]
pub struct RawTrailblazer {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Profile_Link__c")]
    pub profile_link: Option<String>,
}

impl RawTrailblazer {
    /// `None` when the row has no id or no usable profile URL.
    pub fn validate(self) -> Option<SourceRecord> {
        let id = self.id.filter(|s| !s.trim().is_empty())?;
        let profile_url = self
            .profile_link
            .map(|s| s.trim().to_string())
            .filter(|s| s.starts_with("http://") || s.starts_with("https://"))?;
        Some(SourceRecord {
            id,
            name: self.name.unwrap_or_default(),
            profile_url,
        })
    }
}

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Badges__c")]
    badges: u64,
    #[serde(rename = "Points__c")]
    points: u64,
    #[serde(rename = "Trails__c")]
    trails: u64,
}

impl<'a> From<&'a ScrapedStatus> for StatusUpdate<'a> {
    fn from(status: &'a ScrapedStatus) -> Self {
        Self {
            id: &status.id,
            name: &status.name,
            badges: status.badges,
            points: status.points,
            trails: status.trails,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(rename = "Parent")]
    parent: Option<ParentRef>,
    #[serde(rename = "OldValue")]
    old_value: Value,
    #[serde(rename = "NewValue")]
    new_value: Value,
    #[serde(rename = "CreatedDate")]
    created_date: Option<String>,
}

impl From<RawHistory> for HistoryEntry {
    fn from(raw: RawHistory) -> Self {
        Self {
            parent_name: raw.parent.and_then(|p| p.name).unwrap_or_default(),
            old_value: display_value(&raw.old_value),
            new_value: display_value(&raw.new_value),
            changed_at: raw.created_date.as_deref().and_then(parse_crm_datetime),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// CRM timestamps look like `2026-10-16T09:30:00.000+0000`.
fn parse_crm_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// SOQL for badge changes since `since`, newest first.
pub fn history_query(since: DateTime<Utc>) -> String {
    format!(
        "SELECT Parent.Name, OldValue, NewValue, CreatedDate \
         FROM Trailblazer__History \
         WHERE Field = 'Badges__c' AND CreatedDate >= {} \
         ORDER BY CreatedDate DESC",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// [`RecordStore`] backed by the Salesforce REST API.
pub struct CrmRecordStore {
    options: LoginOptions,
    client: OnceCell<CrmClient>,
}

impl CrmRecordStore {
    pub fn new(settings: &CrmSettings) -> Self {
        Self {
            options: LoginOptions {
                login_url: settings.login_url.clone(),
                api_version: settings.api_version.clone(),
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
                username: settings.username.clone(),
                password: settings.password.clone(),
            },
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&CrmClient> {
        self.client
            .get()
            .context("CRM session not established; call authenticate first")
    }
}

#[async_trait]
impl RecordStore for CrmRecordStore {
    async fn authenticate(&self) -> Result<()> {
        let client = self
            .client
            .get_or_try_init(|| CrmClient::login(&self.options))
            .await?;

        info!(instance_url = %client.instance_url(), "CRM session ready");
        if let Some((org_id, user_id)) = client.token().identity() {
            info!(org_id, user_id, "CRM identity");
        }
        Ok(())
    }

    async fn fetch_records(&self) -> Result<Vec<SourceRecord>> {
        let rows: Vec<RawTrailblazer> = self.client()?.query(RECORD_QUERY).await?;

        let total = rows.len();
        let records: Vec<SourceRecord> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let id = row.id.clone();
                let record = row.validate();
                if record.is_none() {
                    warn!(row = i, id = ?id, "Skipping malformed CRM record");
                }
                record
            })
            .collect();

        info!(total, valid = records.len(), "Fetched trailblazer records");
        Ok(records)
    }

    async fn update_statuses(&self, statuses: &[ScrapedStatus]) -> Result<Vec<UpdateOutcome>> {
        let updates: Vec<StatusUpdate> = statuses.iter().map(StatusUpdate::from).collect();
        let results = self.client()?.update_records(SOBJECT, &updates).await?;
        Ok(results.into_iter().map(outcome_from_save).collect())
    }

    async fn recent_history(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>> {
        let rows: Vec<RawHistory> = self.client()?.query(&history_query(since)).await?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }
}

fn outcome_from_save(result: SaveResult) -> UpdateOutcome {
    UpdateOutcome {
        id: result.id,
        success: result.success,
        errors: result
            .errors
            .into_iter()
            .map(|e| format!("{}: {}", e.status_code, e.message))
            .collect(),
    }
}
