use crate::error::ScrapeFailure;
use crate::messages::Message;
use crate::types::{ScrapedStatus, SourceRecord};

/// Which bucket a record's scrape landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Success,
    PageLoadFailed,
    ElementParseFailed,
    ScrapeException,
}

impl Bucket {
    /// Header line for this bucket's failure notification.
    pub fn message(&self) -> Option<Message> {
        match self {
            Self::Success => None,
            Self::PageLoadFailed => Some(Message::PageLoadError),
            Self::ElementParseFailed => Some(Message::ElementParseError),
            Self::ScrapeException => Some(Message::ScrapeError),
        }
    }
}

/// Per-run scrape results, one entry per record in record order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutcomeBuckets {
    pub successes: Vec<ScrapedStatus>,
    pub page_load_failed: Vec<String>,
    pub element_parse_failed: Vec<String>,
    pub scrape_exception: Vec<String>,
}

impl OutcomeBuckets {
    /// Append the result for `record` to exactly one bucket.
    pub fn record(
        &mut self,
        record: &SourceRecord,
        result: Result<ScrapedStatus, ScrapeFailure>,
    ) -> Bucket {
        match result {
            Ok(status) => {
                self.successes.push(status);
                Bucket::Success
            }
            Err(ScrapeFailure::PageLoad) => {
                self.page_load_failed.push(descriptor(record));
                Bucket::PageLoadFailed
            }
            Err(ScrapeFailure::ElementParse) => {
                self.element_parse_failed.push(descriptor(record));
                Bucket::ElementParseFailed
            }
            Err(ScrapeFailure::Exception(_)) => {
                self.scrape_exception.push(descriptor(record));
                Bucket::ScrapeException
            }
        }
    }

    pub fn total(&self) -> usize {
        self.successes.len()
            + self.page_load_failed.len()
            + self.element_parse_failed.len()
            + self.scrape_exception.len()
    }

    /// Failure buckets in notification order.
    pub fn failures(&self) -> [(Bucket, &[String]); 3] {
        [
            (Bucket::PageLoadFailed, self.page_load_failed.as_slice()),
            (Bucket::ElementParseFailed, self.element_parse_failed.as_slice()),
            (Bucket::ScrapeException, self.scrape_exception.as_slice()),
        ]
    }
}

/// `"{id}, {name}, {profile_url}"`
pub fn descriptor(record: &SourceRecord) -> String {
    format!("{}, {}, {}", record.id, record.name, record.profile_url)
}

/// Header line followed by one bullet per entry.
pub fn bullet_list(header: &str, entries: &[String]) -> String {
    format!("{header}\n• {}", entries.join("\n• "))
}
