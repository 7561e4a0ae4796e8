use std::fmt;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{coerce_json_object, truncate_chars, ChatModel};

/// Characters of the email body sent to the classifier
pub const MAX_BODY_CHARS: usize = 8000;

pub const CLASSIFIER_PROMPT: &str = r#"You are an email intent classifier.
Choose exactly ONE label:
- SCHEDULE_MEETING: the sender gives a time for a meeting and the meeting is already set. There is a clear date and time for the meeting.
- REQUEST_SCHEDULED_MEETING: the sender asks you to schedule, confirm or reschedule an already-discussed meeting, or asks for logistics (calendar invite, video call link, time change).
- OTHER: everything else.

Output ONLY valid JSON in this exact schema:
{
"label": "SCHEDULE_MEETING" | "REQUEST_SCHEDULED_MEETING" | "OTHER",
"confidence": number between 0 and 1,
"rationale": "1-2 short sentences"
}
No extra keys. No markdown. No surrounding text."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentLabel {
    #[serde(alias = "INTENT_SCHEDULE_MEETING")]
    ScheduleMeeting,
    RequestScheduledMeeting,
    #[serde(other)]
    Other,
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntentLabel::ScheduleMeeting => "SCHEDULE_MEETING",
            IntentLabel::RequestScheduledMeeting => "REQUEST_SCHEDULED_MEETING",
            IntentLabel::Other => "OTHER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub label: IntentLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

impl IntentClassification {
    pub fn is_scheduled_meeting(&self) -> bool {
        self.label == IntentLabel::ScheduleMeeting
    }
}

/// Ask the model for an intent label; returns the unparsed reply
pub async fn classify_email<M: ChatModel + ?Sized>(model: &M, email_body: &str) -> Result<String> {
    let body = truncate_chars(email_body, MAX_BODY_CHARS);
    info!(
        "Classifying email intent with '{}' ({} chars)",
        model.model_name(),
        body.chars().count()
    );

    let reply = model
        .chat(CLASSIFIER_PROMPT, body, 0.0)
        .await
        .context("Intent classification request failed")?;

    debug!("Classifier reply: {}", reply);
    Ok(reply)
}

/// Coerce a classifier reply into a typed result.
///
/// `label` must be a string. A `confidence` that is not a number (or a
/// numeric string) becomes 0, and a non-string `rationale` becomes "".
pub fn parse_classification(reply: &str) -> Result<IntentClassification> {
    let object = coerce_json_object(reply)?;

    let label: IntentLabel = match object.get("label") {
        Some(Value::String(label)) => {
            serde_json::from_value(Value::String(label.trim().to_string()))
                .context("Classifier JSON does not match the expected schema")?
        }
        Some(other) => anyhow::bail!("Classifier label is not a string: {}", other),
        None => anyhow::bail!("Classifier JSON has no label"),
    };

    let confidence = match object.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())
    .map_or(0.0, |c| c.clamp(0.0, 1.0));

    let rationale = match object.get("rationale") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => {
            warn!("Ignoring non-string rationale in classifier reply: {}", other);
            String::new()
        }
    };

    Ok(IntentClassification {
        label,
        confidence,
        rationale,
    })
}
