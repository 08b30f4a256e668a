//! Profile scraping against scripted pages: polling budget, failure
//! classification and page cleanup.

use std::time::Duration;

use trailstat_sync::config::PollBudget;
use trailstat_sync::error::ScrapeFailure;
use trailstat_sync::scrape::scrape_one;
use trailstat_sync::testing::{profile_url, rank_text, source_record, PageScript, ScriptedBrowser};
use trailstat_sync::types::ScrapedStatus;

fn budget(max_polls: u32) -> PollBudget {
    PollBudget {
        interval: Duration::ZERO,
        max_polls,
    }
}

fn seven_lines() -> String {
    "Badges\n10\nPoints\n2,000\nTrails\n3\nRank".to_string()
}

#[tokio::test]
async fn full_marker_on_first_read_succeeds() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::loaded("Astro Nomical", "1,234", "567,890", "12"),
    );

    let status = scrape_one(&browser, &record, &budget(10)).await.unwrap();

    assert_eq!(
        status,
        ScrapedStatus {
            id: "a01".to_string(),
            name: "Astro Nomical".to_string(),
            badges: 1234,
            points: 567_890,
            trails: 12,
        }
    );
    assert_eq!(browser.marker_reads(&record.profile_url), 1);
    assert_eq!(browser.pages_opened(), 1);
    assert_eq!(browser.pages_closed(), 1);
}

#[tokio::test]
async fn seven_lines_every_read_is_element_parse_failure_after_budget() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::with_reads(vec![Some(seven_lines())], Some("Astro")),
    );

    let err = scrape_one(&browser, &record, &budget(4)).await.unwrap_err();

    assert_eq!(err, ScrapeFailure::ElementParse);
    assert_eq!(browser.marker_reads(&record.profile_url), 4);
    assert_eq!(browser.pages_closed(), 1);
}

#[tokio::test]
async fn missing_marker_is_page_load_failure() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::with_reads(vec![None], Some("Astro")),
    );

    let err = scrape_one(&browser, &record, &budget(5)).await.unwrap_err();

    assert_eq!(err, ScrapeFailure::PageLoad);
    assert_eq!(browser.marker_reads(&record.profile_url), 5);
    assert_eq!(browser.pages_closed(), 1);
}

#[tokio::test]
async fn marker_that_vanishes_after_appearing_is_element_parse_failure() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::with_reads(vec![None, Some(seven_lines()), None], Some("Astro")),
    );

    let err = scrape_one(&browser, &record, &budget(3)).await.unwrap_err();

    assert_eq!(err, ScrapeFailure::ElementParse);
}

#[tokio::test]
async fn marker_completing_late_succeeds_within_budget() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::with_reads(
            vec![None, Some(seven_lines()), Some(rank_text("10", "2,000", "3"))],
            Some("Astro"),
        ),
    );

    let status = scrape_one(&browser, &record, &budget(3)).await.unwrap();

    assert_eq!(status.badges, 10);
    assert_eq!(status.points, 2000);
    assert_eq!(status.trails, 3);
    assert_eq!(browser.marker_reads(&record.profile_url), 3);
}

#[tokio::test]
async fn zero_budget_fails_without_probing() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::loaded("Astro", "1", "2", "3"),
    );

    let err = scrape_one(&browser, &record, &budget(0)).await.unwrap_err();

    assert_eq!(err, ScrapeFailure::PageLoad);
    assert_eq!(browser.marker_reads(&record.profile_url), 0);
    assert_eq!(browser.pages_closed(), 1);
}

#[tokio::test]
async fn navigation_error_is_exception_and_page_still_closed() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::navigation_fails("net::ERR_CONNECTION_RESET"),
    );

    let err = scrape_one(&browser, &record, &budget(3)).await.unwrap_err();

    assert!(
        matches!(err, ScrapeFailure::Exception(ref m) if m.contains("ERR_CONNECTION_RESET")),
        "got {err:?}"
    );
    assert_eq!(browser.pages_opened(), 1);
    assert_eq!(browser.pages_closed(), 1);
}

#[tokio::test]
async fn missing_heading_is_exception() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::with_reads(vec![Some(rank_text("1", "2", "3"))], None),
    );

    let err = scrape_one(&browser, &record, &budget(3)).await.unwrap_err();

    assert!(matches!(err, ScrapeFailure::Exception(_)), "got {err:?}");
}

#[tokio::test]
async fn non_numeric_count_is_exception() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &record.profile_url,
        PageScript::loaded("Astro", "lots", "2", "3"),
    );

    let err = scrape_one(&browser, &record, &budget(3)).await.unwrap_err();

    assert!(matches!(err, ScrapeFailure::Exception(ref m) if m.contains("badges")));
}

#[tokio::test]
async fn unchanged_page_scrapes_identically_twice() {
    let record = source_record("a01");
    let browser = ScriptedBrowser::new().on_page(
        &profile_url("a01"),
        PageScript::loaded("Astro", "45", "31,250", "7"),
    );

    let first = scrape_one(&browser, &record, &budget(3)).await.unwrap();
    let second = scrape_one(&browser, &record, &budget(3)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(browser.pages_opened(), 2);
    assert_eq!(browser.pages_closed(), 2);
}
