use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::backend::NotifyBackend;
use super::Notification;
use crate::config::SlackSettings;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Posts each notification as a single-attachment message via `chat.postMessage`.
pub struct SlackChat {
    settings: SlackSettings,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

impl SlackChat {
    pub fn new(settings: SlackSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn attachments(notification: &Notification) -> String {
        json!([{
            "title": notification.title.as_deref().unwrap_or(""),
            "text": notification.text,
            "color": notification.severity.color(),
        }])
        .to_string()
    }
}

#[async_trait]
impl NotifyBackend for SlackChat {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let attachments = Self::attachments(notification);
        let form = [
            ("token", self.settings.token.as_str()),
            ("channel", self.settings.channel_id.as_str()),
            ("username", self.settings.user_name.as_str()),
            ("attachments", attachments.as_str()),
        ];

        let resp = self.http.post(POST_MESSAGE_URL).form(&form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack returned non-success");
            anyhow::bail!("Slack returned {status}");
        }

        let body: SlackResponse = resp.json().await?;
        if !body.ok {
            let error = body.error.unwrap_or_else(|| "unknown_error".to_string());
            anyhow::bail!("Slack rejected message: {error}");
        }

        info!(ts = body.ts.as_deref().unwrap_or(""), "Slack message posted");
        Ok(())
    }
}
