/// Common structures and utilities for email handling
use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use log::debug;
use serde::Serialize;

use crate::email::body::extract_body;

/// One node of a decoded MIME part tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MimePart {
    pub mime_type: String,
    /// Decoded body bytes, if this part carries any
    pub data: Option<Vec<u8>>,
    pub parts: Vec<MimePart>,
}

impl MimePart {
    pub fn leaf(mime_type: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: Some(data.into()),
            parts: Vec::new(),
        }
    }

    pub fn multipart(mime_type: &str, parts: Vec<MimePart>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: None,
            parts,
        }
    }
}

/// A message as handed over by a mailbox backend, before body selection
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Vec<String>,
    pub internal_date_ms: Option<i64>,
    pub snippet: String,
    /// Top-level headers in message order
    pub headers: Vec<(String, String)>,
    pub payload: MimePart,
}

/// The chosen textual representation of a message body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailBody {
    pub mime_type: Option<String>,
    pub content: String,
}

impl EmailBody {
    pub fn empty() -> Self {
        Self {
            mime_type: None,
            content: String::new(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.mime_type.as_deref() == Some("text/html")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageHeaders {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date_raw: String,
    /// `date_raw` as RFC 3339, empty when it could not be parsed
    pub date_iso: String,
}

/// Email information retrieved from a mailbox
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Vec<String>,
    #[serde(rename = "internalDate_ms")]
    pub internal_date_ms: Option<i64>,
    pub headers: MessageHeaders,
    pub snippet: String,
    pub body: EmailBody,
}

impl MailMessage {
    pub fn from_raw(raw: RawMessage) -> Self {
        let headers = summarize_headers(&raw.headers);
        let body = extract_body(&raw.payload);

        MailMessage {
            id: raw.id,
            thread_id: raw.thread_id,
            label_ids: raw.label_ids,
            internal_date_ms: raw.internal_date_ms,
            headers,
            snippet: raw.snippet,
            body,
        }
    }
}

/// Pick from/to/subject/date out of a header list (names are case-insensitive,
/// the last occurrence wins)
pub fn summarize_headers(headers: &[(String, String)]) -> MessageHeaders {
    let mut summary = MessageHeaders::default();

    for (name, value) in headers {
        match name.to_ascii_lowercase().as_str() {
            "from" => summary.from = value.clone(),
            "to" => summary.to = value.clone(),
            "subject" => summary.subject = value.clone(),
            "date" => summary.date_raw = value.clone(),
            _ => {}
        }
    }

    summary.date_iso = normalize_header_date(&summary.date_raw);
    summary
}

/// Convert an RFC 2822 `Date:` header to RFC 3339, keeping its offset.
///
/// A header without a zone yields a naive timestamp (`2026-01-12T17:41:09`).
/// Returns an empty string when the header is empty or unparseable.
pub fn normalize_header_date(raw: &str) -> String {
    let cleaned = clean_date_header(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    let parsed = DateTime::parse_from_rfc2822(&cleaned).or_else(|e| {
        // Some senders omit the weekday but leave the comma
        match cleaned.split_once(',') {
            Some((_, rest)) => DateTime::parse_from_rfc2822(rest.trim()),
            None => Err(e),
        }
    });

    match parsed {
        Ok(date) => date.to_rfc3339_opts(SecondsFormat::Secs, false),
        Err(e) => match parse_naive_header_date(&cleaned) {
            Some(naive) => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => {
                debug!("Unparseable Date header '{}': {}", raw, e);
                String::new()
            }
        },
    }
}

const NAIVE_DATE_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"];

fn parse_naive_header_date(cleaned: &str) -> Option<NaiveDateTime> {
    let without_weekday = cleaned
        .split_once(',')
        .map_or(cleaned, |(_, rest)| rest)
        .trim();

    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(without_weekday, format).ok())
}

/// Unfold whitespace and drop a trailing zone comment such as `(PST)`
fn clean_date_header(raw: &str) -> String {
    let mut value = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    while value.ends_with(')') {
        match value.rfind('(') {
            Some(idx) => value = value[..idx].trim_end().to_string(),
            None => break,
        }
    }

    value
}
