pub mod body;
pub mod common;
pub mod eml;

// Re-export commonly used items
pub use body::{extract_body, model_input_text};
pub use common::{EmailBody, MailMessage, MessageHeaders, MimePart, RawMessage};
pub use eml::EmlMailbox;
