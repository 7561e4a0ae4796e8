use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

use crate::email::body::{extract_body, model_input_text};
use crate::email::common::{MailMessage, MimePart, RawMessage};
use crate::llm::truncate_chars;
use crate::mailbox::Mailbox;

const SNIPPET_CHARS: usize = 200;

/// Parse a raw RFC 822 message into the mailbox representation
pub fn parse_eml(raw_email: &[u8], fallback_id: &str) -> Result<RawMessage> {
    debug!("Parsing RFC 822 message ({} bytes)", raw_email.len());

    let parsed = MessageParser::default()
        .parse(raw_email)
        .context("Unable to parse email")?;

    let payload = if parsed.parts.is_empty() {
        MimePart::default()
    } else {
        build_part(&parsed, 0, 0)
    };

    let headers: Vec<(String, String)> = parsed
        .headers_raw()
        .map(|(name, value)| (name.to_string(), unfold(value)))
        .collect();

    let id = parsed
        .message_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| fallback_id.to_string());

    let internal_date_ms = parsed.date().map(|date| date.to_timestamp() * 1000);

    let snippet = snippet_of(&model_input_text(&extract_body(&payload)));

    Ok(RawMessage {
        id,
        thread_id: None,
        label_ids: Vec::new(),
        internal_date_ms,
        snippet,
        headers,
        payload,
    })
}

/// Multipart trees deeper than this are cut off
const MAX_DEPTH: usize = 32;

fn build_part(message: &Message<'_>, part_id: usize, depth: usize) -> MimePart {
    let Some(part) = message.parts.get(part_id) else {
        return MimePart::default();
    };

    let declared = part.content_type().map(|ct| match ct.subtype() {
        Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
        None => ct.ctype().to_string(),
    });

    match &part.body {
        PartType::Text(text) => MimePart::leaf(
            &mime_or(declared, "text/plain"),
            text.as_bytes().to_vec(),
        ),
        PartType::Html(html) => MimePart::leaf(
            &mime_or(declared, "text/html"),
            html.as_bytes().to_vec(),
        ),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => MimePart::leaf(
            &mime_or(declared, "application/octet-stream"),
            bytes.to_vec(),
        ),
        // Attached messages are not descended into
        PartType::Message(_) => MimePart {
            mime_type: mime_or(declared, "message/rfc822"),
            data: None,
            parts: Vec::new(),
        },
        PartType::Multipart(children) => {
            let parts = if depth >= MAX_DEPTH {
                Vec::new()
            } else {
                children
                    .iter()
                    .map(|child| build_part(message, *child as usize, depth + 1))
                    .collect()
            };
            MimePart::multipart(&mime_or(declared, "multipart/mixed"), parts)
        }
    }
}

fn mime_or(declared: Option<String>, default: &str) -> String {
    declared
        .map(|mime| mime.to_ascii_lowercase())
        .unwrap_or_else(|| default.to_string())
}

/// Gmail-style preview: whitespace collapsed, first few hundred characters
fn snippet_of(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, SNIPPET_CHARS).to_string()
}

/// Header values keep their folding whitespace in raw form
fn unfold(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A mailbox holding a single message read from a `.eml` file
pub struct EmlMailbox {
    message: RawMessage,
}

impl EmlMailbox {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading message from {}", path.display());

        let content = std::fs::read(path)
            .with_context(|| format!("Unable to read email file {}", path.display()))?;

        let fallback_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());

        Ok(Self {
            message: parse_eml(&content, &fallback_id)?,
        })
    }

    pub fn from_raw(message: RawMessage) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Mailbox for EmlMailbox {
    async fn latest_message_id(&self, _label: Option<&str>) -> Result<Option<String>> {
        Ok(Some(self.message.id.clone()))
    }

    async fn fetch_message(&self, message_id: &str) -> Result<MailMessage> {
        if message_id != self.message.id {
            anyhow::bail!("Message {} not found in local file", message_id);
        }
        Ok(MailMessage::from_raw(self.message.clone()))
    }
}
