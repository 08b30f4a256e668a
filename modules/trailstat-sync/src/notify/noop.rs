use async_trait::async_trait;

use super::backend::NotifyBackend;
use super::Notification;

/// Backend used when notifications are disabled.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, _notification: &Notification) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}
