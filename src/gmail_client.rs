use anyhow::{Result, Context};
use async_trait::async_trait;
use google_gmail1::api::{MessagePart, Scope};
use google_gmail1::{Gmail, hyper, hyper_rustls, oauth2};
use log::{info, debug};

use crate::config::GmailConfig;
use crate::email::{MailMessage, MimePart, RawMessage};
use crate::mailbox::Mailbox;

pub struct GmailClient {
    hub: Gmail<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>,
}

impl GmailClient {
    pub async fn new(config: &GmailConfig, credentials_path: &str) -> Result<Self> {
        info!("Connecting to Gmail API via OAuth2");

        // Read OAuth2 client credentials from file
        let secret = oauth2::read_application_secret(credentials_path)
            .await
            .context("Unable to read OAuth2 client credentials file")?;

        // Interactive browser flow on first run, cached token afterwards
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.token_cache_path)
        .build()
        .await
        .context("Unable to create OAuth2 authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper::Client::builder().build(connector);

        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established successfully");

        Ok(GmailClient { hub })
    }

    /// Newest message ID, optionally restricted to one label
    pub async fn most_recent_message_id(&self, label: Option<&str>) -> Result<Option<String>> {
        let user_id = "me";

        let mut request = self.hub
            .users()
            .messages_list(user_id)
            .max_results(1)
            .add_scope(Scope::Readonly);

        if let Some(label) = label {
            debug!("Restricting search to label '{}'", label);
            request = request.add_label_ids(label);
        }

        let result = request
            .doit()
            .await
            .context("Error listing messages")?;

        let message_id = result.1
            .messages
            .unwrap_or_default()
            .into_iter()
            .find_map(|msg| msg.id);

        match &message_id {
            Some(id) => info!("Newest message: {}", id),
            None => info!("No messages found"),
        }

        Ok(message_id)
    }

    /// Retrieve a complete message (headers and MIME payload)
    pub async fn fetch_message_structured(&self, message_id: &str) -> Result<MailMessage> {
        debug!("Complete email retrieval for ID: {}", message_id);

        let user_id = "me";

        let (_, message) = self.hub
            .users()
            .messages_get(user_id, message_id)
            .format("full")
            .add_scope(Scope::Readonly)
            .doit()
            .await
            .with_context(|| format!("Unable to retrieve email {}", message_id))?;

        let payload = message.payload.unwrap_or_default();

        let headers: Vec<(String, String)> = payload.headers
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|header| match (header.name, header.value) {
                (Some(name), Some(value)) => Some((name, value)),
                _ => None,
            })
            .collect();

        let raw = RawMessage {
            id: message.id.unwrap_or_else(|| message_id.to_string()),
            thread_id: message.thread_id,
            label_ids: message.label_ids.unwrap_or_default(),
            internal_date_ms: message.internal_date,
            snippet: message.snippet.unwrap_or_default(),
            headers,
            payload: convert_part(payload),
        };

        Ok(MailMessage::from_raw(raw))
    }
}

/// Gmail payload to MIME tree; body data arrives already base64url-decoded
fn convert_part(part: MessagePart) -> MimePart {
    MimePart {
        mime_type: part.mime_type.unwrap_or_default(),
        data: part.body.and_then(|body| body.data),
        parts: part.parts
            .unwrap_or_default()
            .into_iter()
            .map(convert_part)
            .collect(),
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn latest_message_id(&self, label: Option<&str>) -> Result<Option<String>> {
        self.most_recent_message_id(label).await
    }

    async fn fetch_message(&self, message_id: &str) -> Result<MailMessage> {
        self.fetch_message_structured(message_id).await
    }
}
