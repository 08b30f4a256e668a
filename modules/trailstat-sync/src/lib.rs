pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod messages;
pub mod notify;
pub mod outcome;
pub mod reconcile;
pub mod runner;
pub mod scrape;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;
