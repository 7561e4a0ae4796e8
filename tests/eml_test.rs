use std::fs;

use meetmail::email::{eml, extract_body, EmlMailbox, MailMessage};
use meetmail::mailbox::Mailbox;

#[test]
fn test_extract_body_from_meeting_email() {
    // Load test email file
    let email_content = fs::read("data_test/meeting.eml")
        .expect("Failed to read test email file data_test/meeting.eml");

    let raw = eml::parse_eml(&email_content, "meeting").expect("Failed to parse email");

    // multipart/mixed > multipart/alternative > text/plain comes first
    let body = extract_body(&raw.payload);
    assert_eq!(body.mime_type.as_deref(), Some("text/plain"));
    assert!(body.content.contains("Let's meet tomorrow at 3pm for 30 minutes"));
    assert!(!body.content.contains("<b>"));
    assert!(!body.content.contains("VCALENDAR"));

    println!("📧 Body extracted ({} chars)", body.content.len());
}

#[test]
fn test_headers_from_meeting_email() {
    let email_content = fs::read("data_test/meeting.eml")
        .expect("Failed to read test email file data_test/meeting.eml");

    let message = MailMessage::from_raw(
        eml::parse_eml(&email_content, "meeting").expect("Failed to parse email"),
    );

    assert_eq!(message.id, "design-review-0112@example.com");
    assert_eq!(message.headers.from, "Dana Reyes <dana@example.com>");
    assert_eq!(message.headers.subject, "Design review");
    // trailing "(PST)" comment is tolerated
    assert_eq!(message.headers.date_iso, "2026-01-12T17:41:09-08:00");
    assert!(message.snippet.starts_with("Hi Sam,"));
}

#[tokio::test]
async fn test_eml_mailbox_from_file() {
    let mailbox = EmlMailbox::open("data_test/meeting.eml").expect("Failed to open test email");

    let id = mailbox
        .latest_message_id(None)
        .await
        .unwrap()
        .expect("mailbox should contain one message");
    let message = mailbox.fetch_message(&id).await.unwrap();

    assert_eq!(message.body.mime_type.as_deref(), Some("text/plain"));
}

#[test]
fn test_missing_eml_file_is_an_error() {
    assert!(EmlMailbox::open("data_test/does-not-exist.eml").is_err());
}
