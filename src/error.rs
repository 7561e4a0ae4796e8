use thiserror::Error;

/// Failure to turn model output into a JSON object
#[derive(Error, Debug)]
pub enum CoerceError {
    /// No `{...}` candidate anywhere in the text
    #[error("Model did not return JSON.")]
    NoJson,

    /// A candidate was found but is not valid JSON
    #[error("Invalid JSON in model output: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

/// Errors raised while talking to the language model
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or connection error
    #[error("Network error: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the model server
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered but the body could not be decoded
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl LlmError {
    pub fn api_error<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
