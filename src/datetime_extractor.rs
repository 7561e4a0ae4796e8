use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::llm::{coerce_json_object, truncate_chars, ChatModel};

/// Characters of the email text sent to the extractor
pub const MAX_TEXT_CHARS: usize = 12000;

/// Meeting time resolved from an email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatetimeExtraction {
    pub timezone: String,
    pub start_iso: String,
    pub end_iso: String,
    pub needs_clarification: bool,
    pub clarification_question: String,
}

impl DatetimeExtraction {
    /// Build the full record from whatever keys the model returned.
    ///
    /// Missing or mistyped keys take their defaults: `timezone` falls back to
    /// `default_timezone`, strings to "", the flag to false.
    pub fn from_partial(object: &Map<String, Value>, default_timezone: &str) -> Self {
        let text = |key: &str| match object.get(key) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Null) | None => None,
            Some(other) => {
                warn!("Ignoring non-string '{}' in extractor reply: {}", key, other);
                None
            }
        };

        let needs_clarification = match object.get("needs_clarification") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        };

        DatetimeExtraction {
            timezone: text("timezone")
                .filter(|tz| !tz.is_empty())
                .unwrap_or_else(|| default_timezone.to_string()),
            start_iso: text("start_iso").unwrap_or_default(),
            end_iso: text("end_iso").unwrap_or_default(),
            needs_clarification,
            clarification_question: text("clarification_question").unwrap_or_default(),
        }
    }

    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.start_iso)
    }

    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.end_iso)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value).ok()
}

/// Current local time with its UTC offset
pub fn local_reference_time() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// `2026-01-12T18:03:00-08:00`
pub fn format_reference(reference: &DateTime<FixedOffset>) -> String {
    reference.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// `-08:00`
pub fn offset_string(reference: &DateTime<FixedOffset>) -> String {
    reference.format("%:z").to_string()
}

pub fn extractor_prompt(reference: &DateTime<FixedOffset>) -> String {
    let now = format_reference(reference);
    let offset = offset_string(reference);

    format!(
        r#"You extract the meeting time from an email.
The current date and time is {now} (UTC offset {offset}). Resolve relative expressions such as "tomorrow" or "next Monday" against it.

Rules:
- If an exact date and time are stated, output start_iso and end_iso as ISO 8601 timestamps with a UTC offset, for example {now}.
- If no duration is stated, assume the meeting lasts 30 minutes.
- If only a time window is given, or the date or time is missing, do not guess: output empty start_iso and end_iso, set needs_clarification to true and write one short clarification_question.
- Unless the email states another timezone, use {offset}.

Output ONLY valid JSON in this exact schema:
{{
"timezone": "IANA timezone name or UTC offset",
"start_iso": "ISO 8601 timestamp with offset, or empty string",
"end_iso": "ISO 8601 timestamp with offset, or empty string",
"needs_clarification": true | false,
"clarification_question": "short question, or empty string"
}}
No extra keys. No markdown. No surrounding text."#
    )
}

/// Ask the model to resolve the meeting start and end relative to `reference`
pub async fn extract_meeting_datetime<M: ChatModel + ?Sized>(
    model: &M,
    email_text: &str,
    reference: DateTime<FixedOffset>,
) -> Result<DatetimeExtraction> {
    let text = truncate_chars(email_text, MAX_TEXT_CHARS);
    info!(
        "Extracting meeting time with '{}' (reference {})",
        model.model_name(),
        format_reference(&reference)
    );

    let reply = model
        .chat(&extractor_prompt(&reference), text, 0.0)
        .await
        .context("Datetime extraction request failed")?;

    debug!("Extractor reply: {}", reply);

    let object = coerce_json_object(&reply)?;
    let extraction = DatetimeExtraction::from_partial(&object, &offset_string(&reference));

    if !extraction.start_iso.is_empty() && extraction.start().is_none() {
        warn!("Model returned a start time that is not RFC 3339: {}", extraction.start_iso);
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reference() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-01-12T18:03:00-08:00").unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_reference_formatting() {
        assert_eq!(format_reference(&reference()), "2026-01-12T18:03:00-08:00");
        assert_eq!(offset_string(&reference()), "-08:00");

        let utc = DateTime::parse_from_rfc3339("2026-01-12T18:03:00Z").unwrap();
        assert_eq!(offset_string(&utc), "+00:00");
    }

    #[test]
    fn test_prompt_embeds_reference() {
        let prompt = extractor_prompt(&reference());
        assert!(prompt.contains("2026-01-12T18:03:00-08:00"));
        assert!(prompt.contains("UTC offset -08:00"));
        assert!(prompt.contains("30 minutes"));
        assert!(prompt.contains("\"needs_clarification\": true | false"));
    }

    #[test]
    fn test_missing_timezone_uses_caller_offset() {
        let partial = object(json!({
            "start_iso": "2026-01-13T15:00:00-08:00",
            "end_iso": "2026-01-13T15:30:00-08:00",
            "needs_clarification": false,
            "clarification_question": ""
        }));

        let extraction = DatetimeExtraction::from_partial(&partial, "-08:00");
        assert_eq!(
            extraction,
            DatetimeExtraction {
                timezone: "-08:00".to_string(),
                start_iso: "2026-01-13T15:00:00-08:00".to_string(),
                end_iso: "2026-01-13T15:30:00-08:00".to_string(),
                needs_clarification: false,
                clarification_question: String::new(),
            }
        );
    }

    #[test]
    fn test_empty_object_gets_all_defaults() {
        let extraction = DatetimeExtraction::from_partial(&Map::new(), "+02:00");
        assert_eq!(extraction.timezone, "+02:00");
        assert_eq!(extraction.start_iso, "");
        assert_eq!(extraction.end_iso, "");
        assert!(!extraction.needs_clarification);
        assert_eq!(extraction.clarification_question, "");
        assert_eq!(extraction.start(), None);
    }

    #[test]
    fn test_mistyped_values_are_defaulted() {
        let partial = object(json!({
            "timezone": null,
            "start_iso": 1768345200,
            "needs_clarification": "true",
            "clarification_question": ["which day?"]
        }));

        let extraction = DatetimeExtraction::from_partial(&partial, "-08:00");
        assert_eq!(extraction.timezone, "-08:00");
        assert_eq!(extraction.start_iso, "");
        assert!(extraction.needs_clarification);
        assert_eq!(extraction.clarification_question, "");
    }

    #[test]
    fn test_output_has_exactly_five_keys() {
        let extraction = DatetimeExtraction::from_partial(
            &object(json!({"timezone": "America/Los_Angeles", "extra": 1})),
            "-08:00",
        );
        let value = serde_json::to_value(&extraction).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();

        assert_eq!(keys.len(), 5);
        assert_eq!(value["timezone"], "America/Los_Angeles");
    }

    #[test]
    fn test_start_and_end_accessors() {
        let extraction = DatetimeExtraction::from_partial(
            &object(json!({
                "start_iso": "2026-01-13T15:00:00-08:00",
                "end_iso": "not a time"
            })),
            "-08:00",
        );

        let start = extraction.start().unwrap();
        assert_eq!(start.to_rfc3339(), "2026-01-13T15:00:00-08:00");
        assert_eq!(extraction.end(), None);
    }
}
