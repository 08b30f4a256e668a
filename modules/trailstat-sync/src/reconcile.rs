use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::error::SyncError;
use crate::messages::{Locale, Message};
use crate::notify::{Notification, Notifier};
use crate::traits::RecordStore;
use crate::types::{HistoryEntry, ScrapedStatus, Severity};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: u64,
    pub failed: u64,
    pub history_changes: u64,
}

/// Writes scraped stats back to the store and optionally reports the
/// badge changes that write produced.
pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    notifier: &'a Notifier,
    locale: Locale,
    export_history: bool,
    history_window: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        notifier: &'a Notifier,
        locale: Locale,
        export_history: bool,
        history_window_minutes: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            locale,
            export_history,
            history_window: Duration::minutes(history_window_minutes),
        }
    }

    /// One batch update. Item failures are logged and counted, never retried.
    /// `Err` only when the batch itself could not be submitted.
    pub async fn reconcile(
        &self,
        statuses: &[ScrapedStatus],
    ) -> Result<ReconcileReport, SyncError> {
        let mut report = ReconcileReport::default();
        if statuses.is_empty() {
            info!("No scraped statuses to update");
            return Ok(report);
        }

        let outcomes = self
            .store
            .update_statuses(statuses)
            .await
            .map_err(|e| SyncError::Update(e.to_string()))?;

        for outcome in &outcomes {
            let id = outcome.id.as_deref().unwrap_or("<unknown>");
            if outcome.success {
                report.updated += 1;
                info!("Updated Successfully: {id}");
            } else {
                report.failed += 1;
                warn!(id, errors = ?outcome.errors, "Record update failed");
            }
        }

        if self.export_history {
            report.history_changes = self.report_history().await;
        }

        Ok(report)
    }

    /// Send the recent badge changes as one notification. Query failures are
    /// reported but do not fail the run.
    async fn report_history(&self) -> u64 {
        let since = Utc::now() - self.history_window;
        match self.store.recent_history(since).await {
            Ok(entries) => {
                info!(changes = entries.len(), %since, "Fetched badge history");
                if entries.is_empty() {
                    return 0;
                }
                self.notifier
                    .notify(
                        Notification::new(format_history(&entries), Severity::Highlight)
                            .titled(self.locale.text(Message::Difference)),
                    )
                    .await;
                entries.len() as u64
            }
            Err(e) => {
                warn!(error = %e, "Badge history query failed");
                self.notifier
                    .notify(
                        Notification::new(
                            format!("{}\n{e}", self.locale.text(Message::QueryError)),
                            Severity::Danger,
                        )
                        .titled(self.locale.text(Message::Failure)),
                    )
                    .await;
                0
            }
        }
    }
}

/// One `• {name} : {old} -> {new}` line per change.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("• {} : {} -> {}", e.parent_name, e.old_value, e.new_value))
        .collect::<Vec<_>>()
        .join("\n")
}
