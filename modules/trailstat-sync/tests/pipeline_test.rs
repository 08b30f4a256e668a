//! End-to-end sync runs over the in-memory store, scripted browser and
//! recording notifier.

use trailstat_sync::config::Config;
use trailstat_sync::error::SyncError;
use trailstat_sync::runner::SyncRun;
use trailstat_sync::testing::{
    source_record, test_config, MockRecordStore, PageScript, RecordingNotifier, ScriptedBrowser,
};
use trailstat_sync::types::{HistoryEntry, Severity};

struct Harness {
    store: MockRecordStore,
    browser: ScriptedBrowser,
    notifications: RecordingNotifier,
    _dir: tempfile::TempDir,
    config: Config,
}

impl Harness {
    fn new(store: MockRecordStore, browser: ScriptedBrowser) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 3);
        Self {
            store,
            browser,
            notifications: RecordingNotifier::new(),
            _dir: dir,
            config,
        }
    }

    fn run(&self) -> SyncRun {
        SyncRun::new(
            self.config.clone(),
            Box::new(self.store.clone()),
            Box::new(self.browser.clone()),
            self.notifications.notifier(),
        )
    }

    fn csv(&self) -> String {
        std::fs::read_to_string(&self.config.csv_path).unwrap()
    }

    fn texts_with(&self, severity: Severity) -> Vec<String> {
        self.notifications
            .sent()
            .into_iter()
            .filter(|n| n.severity == severity)
            .map(|n| n.text)
            .collect()
    }
}

/// Three profiles where the second one fails to navigate.
fn three_with_broken_second() -> (MockRecordStore, ScriptedBrowser) {
    let records = vec![source_record("r1"), source_record("r2"), source_record("r3")];
    let browser = ScriptedBrowser::new()
        .on_page(&records[0].profile_url, PageScript::loaded("One", "10", "1,000", "1"))
        .on_page(
            &records[1].profile_url,
            PageScript::navigation_fails("net::ERR_TIMED_OUT"),
        )
        .on_page(&records[2].profile_url, PageScript::loaded("Three", "30", "3,000", "3"));
    (MockRecordStore::new().with_records(records), browser)
}

#[tokio::test]
async fn navigation_failure_stays_local_to_its_record() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store, browser);

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.records_fetched, 3);
    assert_eq!(stats.scraped, 2);
    assert_eq!(stats.scrape_exceptions, 1);

    let batches = h.store.update_batches();
    assert_eq!(batches.len(), 1);
    let ids: Vec<&str> = batches[0].iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r3"]);

    assert_eq!(h.browser.sessions_launched(), 1);
    assert_eq!(h.browser.pages_opened(), 3);
    assert_eq!(h.browser.pages_closed(), 3);
    assert_eq!(h.browser.sessions_closed(), 1);

    let warnings = h.texts_with(Severity::Warning);
    assert_eq!(
        warnings,
        vec![format!(
            "Failed to scrape profile data.\n• r2, Trailblazer r2, {}",
            source_record("r2").profile_url
        )]
    );
}

#[tokio::test]
async fn every_record_lands_in_one_bucket() {
    let records = vec![
        source_record("ok"),
        source_record("blank"),
        source_record("partial"),
        source_record("broken"),
    ];
    let browser = ScriptedBrowser::new()
        .on_page(&records[0].profile_url, PageScript::loaded("Ok", "1", "2", "3"))
        .on_page(&records[1].profile_url, PageScript::with_reads(vec![None], Some("Blank")))
        .on_page(
            &records[2].profile_url,
            PageScript::with_reads(vec![Some("Badges\n1\nPoints".to_string())], Some("Partial")),
        );
    let h = Harness::new(MockRecordStore::new().with_records(records), browser);

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.scraped, 1);
    assert_eq!(stats.page_load_failed, 1);
    assert_eq!(stats.element_parse_failed, 1);
    assert_eq!(stats.scrape_exceptions, 1);
    assert_eq!(
        stats.scraped
            + stats.page_load_failed
            + stats.element_parse_failed
            + stats.scrape_exceptions,
        stats.records_fetched
    );

    // One warning per non-empty failure bucket, page load first
    let warnings = h.texts_with(Severity::Warning);
    assert_eq!(warnings.len(), 3);
    assert!(warnings[0].starts_with("Failed to load the profile page.\n• blank,"));
    assert!(warnings[1].starts_with("Failed to read the status element.\n• partial,"));
    assert!(warnings[2].starts_with("Failed to scrape profile data.\n• broken,"));
}

#[tokio::test]
async fn update_disabled_skips_reconcile_but_exports() {
    let (store, browser) = three_with_broken_second();
    let mut h = Harness::new(store, browser);
    h.config.crm.should_update = false;

    let stats = h.run().run().await.unwrap();

    assert!(h.store.update_batches().is_empty());
    assert_eq!(stats.crm_updated, 0);
    assert_eq!(
        h.csv(),
        "id,name,badges,points,trails\nr1,One,10,1000,1\nr3,Three,30,3000,3\n"
    );
    assert_eq!(stats.csv_rows, 2);
}

#[tokio::test]
async fn notifications_open_with_start_and_close_with_processed() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store, browser);

    h.run().run().await.unwrap();

    let sent = h.notifications.sent();
    assert_eq!(sent.first().map(|n| n.severity), Some(Severity::Info));
    assert_eq!(sent.first().map(|n| n.text.as_str()), Some("Trailblazer status sync started."));
    assert_eq!(sent.last().map(|n| n.severity), Some(Severity::Good));
    assert_eq!(sent.last().map(|n| n.text.as_str()), Some("Trailblazer status sync processed."));
}

#[tokio::test]
async fn authentication_failure_aborts_before_browsing() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store.failing_auth(), browser);

    let err = h.run().run().await.unwrap_err();

    assert!(matches!(err, SyncError::Authentication(_)), "got {err:?}");
    assert!(!err.is_fatal(), "handled aborts exit cleanly");
    assert_eq!(h.browser.sessions_launched(), 0);
    assert!(!h.config.csv_path.exists());

    let dangers = h.texts_with(Severity::Danger);
    assert_eq!(dangers.len(), 1);
    assert!(dangers[0].starts_with("Failed to authenticate with Salesforce."));
}

#[tokio::test]
async fn record_query_failure_aborts_with_query_error() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store.failing_query(), browser);

    let err = h.run().run().await.unwrap_err();

    assert!(matches!(err, SyncError::Query(_)), "got {err:?}");
    assert!(!err.is_fatal(), "handled aborts exit cleanly");
    assert_eq!(h.browser.sessions_launched(), 0);
    assert!(h.texts_with(Severity::Danger)[0].starts_with("Failed to query Salesforce."));
}

#[tokio::test]
async fn browser_launch_failure_notifies_crash() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store, browser.failing_launch());

    let err = h.run().run().await.unwrap_err();

    assert!(matches!(err, SyncError::Browser(_)), "got {err:?}");
    assert!(err.is_fatal());
    assert!(h.texts_with(Severity::Danger)[0].starts_with("The headless browser crashed."));
}

#[tokio::test]
async fn batch_update_failure_still_exports_csv() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store.failing_update(), browser);

    let stats = h.run().run().await.unwrap();

    assert_eq!(h.store.update_batches().len(), 1);
    assert_eq!(stats.crm_updated, 0);
    assert_eq!(stats.csv_rows, 2);
    assert!(h.csv().contains("r3,Three,30,3000,3"));
    let dangers = h.texts_with(Severity::Danger);
    assert!(dangers[0].starts_with("Failed to update records in Salesforce."));
}

#[tokio::test]
async fn rejected_items_are_counted_not_retried() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store.reject("r3"), browser);

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.crm_updated, 1);
    assert_eq!(stats.crm_update_failed, 1);
    assert_eq!(h.store.update_batches().len(), 1);
}

#[tokio::test]
async fn badge_history_is_reported_as_one_highlight() {
    let (store, browser) = three_with_broken_second();
    let store = store.with_history(vec![
        HistoryEntry {
            parent_name: "Three".to_string(),
            old_value: "28".to_string(),
            new_value: "30".to_string(),
            changed_at: None,
        },
        HistoryEntry {
            parent_name: "One".to_string(),
            old_value: "9".to_string(),
            new_value: "10".to_string(),
            changed_at: None,
        },
    ]);
    let mut h = Harness::new(store, browser);
    h.config.crm.should_export_history = true;

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.history_changes, 2);
    assert_eq!(h.store.history_queries().len(), 1);

    let highlight: Vec<_> = h
        .notifications
        .sent()
        .into_iter()
        .filter(|n| n.severity == Severity::Highlight)
        .collect();
    assert_eq!(highlight.len(), 1);
    assert_eq!(highlight[0].title.as_deref(), Some("Badge changes"));
    assert_eq!(highlight[0].text, "• Three : 28 -> 30\n• One : 9 -> 10");
}

#[tokio::test]
async fn history_failure_is_not_fatal() {
    let (store, browser) = three_with_broken_second();
    let mut h = Harness::new(store.failing_history(), browser);
    h.config.crm.should_export_history = true;

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.crm_updated, 2);
    assert_eq!(stats.history_changes, 0);
    assert!(h.texts_with(Severity::Danger)[0].starts_with("Failed to query Salesforce."));
    assert_eq!(stats.csv_rows, 2);
}

#[tokio::test]
async fn csv_save_failure_is_returned_after_notifying() {
    let (store, browser) = three_with_broken_second();
    let h = Harness::new(store, browser);
    // A directory where the file should go
    std::fs::create_dir_all(&h.config.csv_path).unwrap();

    let err = h.run().run().await.unwrap_err();

    assert!(matches!(err, SyncError::CsvSave(_)), "got {err:?}");
    assert!(err.is_fatal());
    assert!(h.texts_with(Severity::Danger)[0].starts_with("Failed to save the CSV export."));
    assert!(h.texts_with(Severity::Good).is_empty());
}

#[tokio::test]
async fn delivery_failures_do_not_change_the_outcome() {
    let (store, browser) = three_with_broken_second();
    let mut h = Harness::new(store, browser);
    h.notifications = RecordingNotifier::new().failing();

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.scraped, 2);
    assert!(!h.notifications.sent().is_empty());
}

#[tokio::test]
async fn empty_record_set_exports_header_only() {
    let h = Harness::new(MockRecordStore::new(), ScriptedBrowser::new());

    let stats = h.run().run().await.unwrap();

    assert_eq!(stats.records_fetched, 0);
    assert_eq!(h.browser.sessions_closed(), 1);
    assert!(h.store.update_batches().is_empty());
    assert_eq!(h.csv(), "id,name,badges,points,trails\n");
}
