use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("CRM authentication error: {0}")]
    Authentication(String),

    #[error("CRM query error: {0}")]
    Query(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CRM update error: {0}")]
    Update(String),

    #[error("CSV preparation error: {0}")]
    CsvPreparation(String),

    #[error("CSV save error: {0}")]
    CsvSave(String),
}

impl SyncError {
    /// Whether the process should exit non-zero. CRM login, query and update
    /// failures are already notified and end the run cleanly.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Authentication(_) | Self::Query(_) | Self::Update(_) => false,
            Self::Browser(_) | Self::CsvPreparation(_) | Self::CsvSave(_) => true,
        }
    }
}

/// Why a single profile could not be scraped. Never aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeFailure {
    #[error("marker element never appeared")]
    PageLoad,

    #[error("marker element never reached its full line count")]
    ElementParse,

    #[error("scrape failed: {0}")]
    Exception(String),
}

impl ScrapeFailure {
    pub fn exception(err: impl std::fmt::Display) -> Self {
        Self::Exception(err.to_string())
    }
}
