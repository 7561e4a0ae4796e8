// Library exports for meetmail crate
// This allows tests and the binary to use the modules

pub mod config;
pub mod error;
pub mod email;
pub mod gmail_client;
pub mod mailbox;

// Language model access and output coercion
pub mod llm;

// Intent classification and meeting time extraction
pub mod intent;
pub mod datetime_extractor;

pub mod pipeline;
