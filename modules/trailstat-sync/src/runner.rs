use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::SyncError;
use crate::export::export_csv;
use crate::messages::Message;
use crate::notify::{Notification, Notifier};
use crate::outcome::{bullet_list, OutcomeBuckets};
use crate::reconcile::Reconciler;
use crate::scrape::scrape_one;
use crate::traits::{BrowserLauncher, ProfileBrowser, RecordStore};
use crate::types::{RunStats, Severity, SourceRecord};

/// One end-to-end sync: fetch, scrape, reconcile, export, report.
pub struct SyncRun {
    config: Config,
    store: Box<dyn RecordStore>,
    launcher: Box<dyn BrowserLauncher>,
    notifier: Notifier,
}

impl SyncRun {
    pub fn new(
        config: Config,
        store: Box<dyn RecordStore>,
        launcher: Box<dyn BrowserLauncher>,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            store,
            launcher,
            notifier,
        }
    }

    pub async fn run(&self) -> Result<RunStats, SyncError> {
        info!("----------------------------------------");
        info!("Run initiated");
        self.announce(Message::Initiated).await;

        let mut stats = RunStats::default();

        if let Err(e) = self.store.authenticate().await {
            error!(error = %e, "CRM authentication failed");
            self.danger(Message::AuthenticationError, &e).await;
            return Err(SyncError::Authentication(e.to_string()));
        }

        let records = match self.store.fetch_records().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "CRM record query failed");
                self.danger(Message::QueryError, &e).await;
                return Err(SyncError::Query(e.to_string()));
            }
        };
        stats.records_fetched = records.len() as u64;

        let mut browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                error!(error = %e, "Browser launch failed");
                self.danger(Message::BrowserCrash, &e).await;
                return Err(SyncError::Browser(e.to_string()));
            }
        };

        let buckets = self.scrape_all(browser.as_ref(), &records).await;

        // Always close the session before reporting
        match browser.close().await {
            Ok(()) => info!("browser closed"),
            Err(e) => warn!(error = %e, "Failed to close browser"),
        }

        stats.scraped = buckets.successes.len() as u64;
        stats.page_load_failed = buckets.page_load_failed.len() as u64;
        stats.element_parse_failed = buckets.element_parse_failed.len() as u64;
        stats.scrape_exceptions = buckets.scrape_exception.len() as u64;

        self.report_failures(&buckets).await;

        if self.config.crm.should_update {
            let reconciler = Reconciler::new(
                self.store.as_ref(),
                &self.notifier,
                self.config.locale,
                self.config.crm.should_export_history,
                self.config.crm.history_window_minutes,
            );
            match reconciler.reconcile(&buckets.successes).await {
                Ok(report) => {
                    stats.crm_updated = report.updated;
                    stats.crm_update_failed = report.failed;
                    stats.history_changes = report.history_changes;
                }
                Err(e) => {
                    error!(error = %e, "CRM update failed");
                    self.danger(Message::UpdateError, &e).await;
                }
            }
        } else {
            info!("CRM update disabled, skipping");
        }

        if let Err(e) = export_csv(&buckets.successes, &self.config.csv_path) {
            error!(error = %e, "CSV export failed");
            let message = match &e {
                SyncError::CsvPreparation(_) => Message::CsvPreparationError,
                _ => Message::CsvSaveError,
            };
            self.danger(message, &e).await;
            return Err(e);
        }
        stats.csv_rows = buckets.successes.len() as u64;

        self.notifier
            .notify(Notification::new(
                self.config.locale.text(Message::Processed),
                Severity::Good,
            ))
            .await;

        info!("Run complete. {stats}");
        Ok(stats)
    }

    /// Scrape every record in order. Failures stay local to their record.
    async fn scrape_all(
        &self,
        browser: &dyn ProfileBrowser,
        records: &[SourceRecord],
    ) -> OutcomeBuckets {
        let mut buckets = OutcomeBuckets::default();
        let total = records.len();

        for (i, record) in records.iter().enumerate() {
            info!("progress {} / {}", i + 1, total);
            let result = scrape_one(browser, record, &self.config.poll).await;
            if let Err(ref failure) = result {
                warn!(
                    id = %record.id,
                    url = %record.profile_url,
                    error = %failure,
                    "Scrape failed"
                );
            }
            buckets.record(record, result);
        }

        buckets
    }

    /// One warning per non-empty failure bucket.
    async fn report_failures(&self, buckets: &OutcomeBuckets) {
        for (bucket, entries) in buckets.failures() {
            if entries.is_empty() {
                continue;
            }
            let Some(message) = bucket.message() else {
                continue;
            };
            self.notifier
                .notify(
                    Notification::new(
                        bullet_list(self.config.locale.text(message), entries),
                        Severity::Warning,
                    )
                    .titled(self.config.locale.text(Message::Failure)),
                )
                .await;
        }
    }

    async fn announce(&self, message: Message) {
        self.notifier
            .notify(Notification::new(
                self.config.locale.text(message),
                Severity::Info,
            ))
            .await;
    }

    async fn danger(&self, message: Message, err: &(dyn std::fmt::Display + Sync)) {
        self.notifier
            .notify(
                Notification::new(
                    format!("{}\n{err}", self.config.locale.text(message)),
                    Severity::Danger,
                )
                .titled(self.config.locale.text(Message::Failure)),
            )
            .await;
    }
}
