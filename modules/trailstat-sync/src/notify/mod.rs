pub mod backend;
pub mod noop;
pub mod slack;

use tracing::{info, warn};

use crate::config::Config;
use crate::types::Severity;
use backend::NotifyBackend;
use noop::NoopBackend;
use slack::SlackChat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: Option<String>,
    pub text: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: None,
            text: text.into(),
            severity,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Best-effort front for a [`NotifyBackend`]: delivery failures are logged
/// and swallowed.
pub struct Notifier {
    backend: Box<dyn NotifyBackend>,
}

impl Notifier {
    pub fn new(backend: Box<dyn NotifyBackend>) -> Self {
        Self { backend }
    }

    /// Slack when configured, otherwise a no-op.
    pub fn from_config(config: &Config) -> Self {
        match &config.slack {
            Some(settings) => {
                info!(channel = %settings.channel_id, "Slack notifications enabled");
                Self::new(Box::new(SlackChat::new(settings.clone())))
            }
            None => {
                info!("Slack notifications disabled");
                Self::new(Box::new(NoopBackend))
            }
        }
    }

    /// Whether notifications leave the process at all.
    pub fn is_enabled(&self) -> bool {
        !self.backend.is_noop()
    }

    pub async fn notify(&self, notification: Notification) {
        if let Err(e) = self.backend.send(&notification).await {
            warn!(error = %e, severity = %notification.severity, "Failed to send notification");
        }
    }
}
