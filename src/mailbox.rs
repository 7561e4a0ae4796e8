use anyhow::Result;
use async_trait::async_trait;

use crate::email::MailMessage;

/// Read-only access to a mailbox
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// ID of the newest message, restricted to `label` when given
    async fn latest_message_id(&self, label: Option<&str>) -> Result<Option<String>>;

    /// Full message with headers and selected body
    async fn fetch_message(&self, message_id: &str) -> Result<MailMessage>;
}
