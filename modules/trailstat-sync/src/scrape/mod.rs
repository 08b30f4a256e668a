pub mod poll;

use std::num::ParseIntError;

use tracing::{info, warn};

use crate::config::PollBudget;
use crate::error::ScrapeFailure;
use crate::traits::{ProfileBrowser, ProfilePage};
use crate::types::{ScrapedStatus, SourceRecord};
use poll::{Exhaustion, PollState};

/// Element whose text carries the rank block.
pub const MARKER_SELECTOR: &str = "c-trailhead-rank";
/// Page heading holding the profile's display name.
pub const HEADING_SELECTOR: &str = "h1";

const BADGES_LINE: usize = 1;
const POINTS_LINE: usize = 3;
const TRAILS_LINE: usize = 5;

/// Parse a count such as `"1,234"`, ignoring thousands separators.
pub fn parse_count(text: &str) -> Result<u64, ParseIntError> {
    text.trim().replace(',', "").parse()
}

/// Build a status from the marker's lines and the page heading.
pub fn parse_status(
    record: &SourceRecord,
    lines: &[String],
    heading: &str,
) -> Result<ScrapedStatus, ScrapeFailure> {
    let field = |index: usize, label: &str| -> Result<u64, ScrapeFailure> {
        let raw = lines
            .get(index)
            .ok_or_else(|| ScrapeFailure::Exception(format!("missing {label} line")))?;
        parse_count(raw).map_err(|e| ScrapeFailure::Exception(format!("{label} '{raw}': {e}")))
    };

    Ok(ScrapedStatus {
        id: record.id.clone(),
        name: heading.trim().to_string(),
        badges: field(BADGES_LINE, "badges")?,
        points: field(POINTS_LINE, "points")?,
        trails: field(TRAILS_LINE, "trails")?,
    })
}

/// Scrape one profile in its own page. The page is closed on every path.
pub async fn scrape_one(
    browser: &dyn ProfileBrowser,
    record: &SourceRecord,
    budget: &PollBudget,
) -> Result<ScrapedStatus, ScrapeFailure> {
    let mut page = browser.open_page().await.map_err(ScrapeFailure::exception)?;

    let result = scrape_page(page.as_mut(), record, budget).await;

    if let Err(e) = page.close().await {
        warn!(id = %record.id, error = %e, "Failed to close page");
    }

    result
}

async fn scrape_page(
    page: &mut dyn ProfilePage,
    record: &SourceRecord,
    budget: &PollBudget,
) -> Result<ScrapedStatus, ScrapeFailure> {
    page.goto(&record.profile_url)
        .await
        .map_err(ScrapeFailure::exception)?;

    let mut state = PollState::start(budget.max_polls);
    loop {
        match state {
            PollState::ElementStable(lines) => {
                let heading = page
                    .text_of(HEADING_SELECTOR)
                    .await
                    .map_err(ScrapeFailure::exception)?
                    .ok_or_else(|| {
                        ScrapeFailure::Exception("profile heading missing".to_string())
                    })?;
                let status = parse_status(record, &lines, &heading)?;
                info!(
                    id = %status.id,
                    name = %status.name,
                    badges = status.badges,
                    points = status.points,
                    trails = status.trails,
                    "Scraped profile"
                );
                return Ok(status);
            }
            PollState::Exhausted(Exhaustion::PageNotLoaded) => return Err(ScrapeFailure::PageLoad),
            PollState::Exhausted(Exhaustion::ElementNotLoaded) => {
                return Err(ScrapeFailure::ElementParse)
            }
            PollState::Polling { attempt } | PollState::PageLoaded { attempt } => {
                if attempt > 0 {
                    if matches!(state, PollState::PageLoaded { .. }) {
                        info!("waiting for element to load... {attempt}");
                    } else {
                        info!("waiting for page to load... {attempt}");
                    }
                }
                tokio::time::sleep(budget.interval).await;
                let read = page
                    .text_of(MARKER_SELECTOR)
                    .await
                    .map_err(ScrapeFailure::exception)?;
                state = state.advance(read.as_deref(), budget.max_polls);
            }
        }
    }
}
