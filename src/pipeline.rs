use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use log::{info, warn};
use serde::Serialize;

use crate::datetime_extractor::{extract_meeting_datetime, DatetimeExtraction};
use crate::email::{model_input_text, MailMessage};
use crate::intent::{classify_email, parse_classification, IntentClassification};
use crate::llm::ChatModel;
use crate::mailbox::Mailbox;

pub const NO_MESSAGES_ERROR: &str = "No messages found in Inbox.";

/// Knobs for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Label scope for "newest message"; `None` searches all mail
    pub label: Option<String>,
    /// Point in time that relative expressions are resolved against
    pub reference: DateTime<FixedOffset>,
}

/// Everything one run produced, in the order it was produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub message: MailMessage,
    pub classifier_reply: String,
    pub classification: IntentClassification,
    /// Present only for SCHEDULE_MEETING
    pub meeting: Option<DatetimeExtraction>,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    EmptyMailbox,
    Processed(Box<PipelineReport>),
}

/// Newest message → body → intent → (meeting time)
pub async fn run_pipeline<B, M>(
    mailbox: &B,
    model: &M,
    options: &PipelineOptions,
) -> Result<PipelineOutcome>
where
    B: Mailbox + ?Sized,
    M: ChatModel + ?Sized,
{
    // 1. Newest message in scope
    let Some(message_id) = mailbox
        .latest_message_id(options.label.as_deref())
        .await
        .context("Error searching for the newest message")?
    else {
        warn!("{}", NO_MESSAGES_ERROR);
        return Ok(PipelineOutcome::EmptyMailbox);
    };

    // 2. Fetch it and pick the body
    let message = mailbox
        .fetch_message(&message_id)
        .await
        .context("Unable to fetch the newest message")?;

    info!(
        "Processing message {} ({:?}, {} chars)",
        message.id,
        message.body.mime_type,
        message.body.content.len()
    );

    let text = model_input_text(&message.body).into_owned();

    // 3. Classify
    let classifier_reply = classify_email(model, &text).await?;
    let classification = parse_classification(&classifier_reply)?;
    info!(
        "Intent: {} (confidence {:.2})",
        classification.label, classification.confidence
    );

    // 4. Resolve the meeting time only when one is already set
    let meeting = if classification.is_scheduled_meeting() {
        Some(extract_meeting_datetime(model, &text, options.reference).await?)
    } else {
        info!("No scheduled meeting, skipping datetime extraction");
        None
    };

    Ok(PipelineOutcome::Processed(Box::new(PipelineReport {
        message,
        classifier_reply,
        classification,
        meeting,
    })))
}

/// Human-readable summary of the meeting result
pub fn meeting_summary(meeting: &DatetimeExtraction) -> String {
    if meeting.needs_clarification || meeting.start_iso.is_empty() {
        let question = if meeting.clarification_question.is_empty() {
            "the meeting time is unclear"
        } else {
            meeting.clarification_question.as_str()
        };
        return format!("❓ Needs clarification: {}", question);
    }

    match meeting.start() {
        Some(start) => {
            let mut line = format!("📅 Meeting starts at {}", start.format("%Y-%m-%d %H:%M %:z"));
            if let Some(end) = meeting.end() {
                line.push_str(&format!(" and ends at {}", end.format("%H:%M")));
            }
            line
        }
        None => format!("📅 Meeting starts at {} (unparsed)", meeting.start_iso),
    }
}
