use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_MAILBOX_LABEL: &str = "INBOX";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gmail: GmailConfig,
    pub ollama: OllamaConfig,
    /// Label scope for "newest message"; `None` searches all mail
    pub mailbox_label: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GmailConfig {
    pub credentials_path: Option<String>,
    pub token_cache_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Config {
    /// Configuration loaded from environment variables
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            gmail: GmailConfig {
                credentials_path: non_empty("GMAIL_CREDENTIALS_PATH"),
                token_cache_path: non_empty("GMAIL_TOKEN_CACHE_PATH")
                    .unwrap_or_else(|| "./gmail-token-cache.json".to_string()),
            },
            ollama: OllamaConfig {
                base_url: non_empty("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                model: non_empty("OLLAMA_MODEL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            },
            mailbox_label: Some(
                non_empty("MAILBOX_LABEL").unwrap_or_else(|| DEFAULT_MAILBOX_LABEL.to_string()),
            ),
        }
    }

    /// Path of the OAuth2 client secret file, or an explanation of how to set it
    pub fn require_gmail_credentials(&self) -> Result<&str> {
        match self.gmail.credentials_path.as_deref() {
            Some(path) => Ok(path),
            None => anyhow::bail!(
                "Missing environment variable: GMAIL_CREDENTIALS_PATH\n\
                 \n\
                 💡 Solutions:\n\
                 1. Create a .env file with your credentials:\n\
                    GMAIL_CREDENTIALS_PATH=/path/to/client.json\n\
                    GMAIL_TOKEN_CACHE_PATH=./gmail-token-cache.json\n\
                 \n\
                 2. Or export the variables manually:\n\
                    export GMAIL_CREDENTIALS_PATH=/path/to/client.json\n\
                    cargo run\n\
                 \n\
                 3. Or run offline against a saved message:\n\
                    cargo run -- --eml path/to/message.eml"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.gmail.credentials_path, None);
        assert_eq!(config.gmail.token_cache_path, "./gmail-token-cache.json");
        assert_eq!(config.ollama.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.ollama.model, "llama3.2");
        assert_eq!(config.mailbox_label.as_deref(), Some("INBOX"));
        assert!(config.require_gmail_credentials().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GMAIL_CREDENTIALS_PATH", "/secrets/client.json"),
            ("OLLAMA_MODEL", "qwen2.5"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("MAILBOX_LABEL", "Label_42"),
        ]);
        assert_eq!(config.require_gmail_credentials().unwrap(), "/secrets/client.json");
        assert_eq!(config.ollama.model, "qwen2.5");
        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.mailbox_label.as_deref(), Some("Label_42"));
    }

    #[test]
    fn test_new_reads_process_environment() {
        let config = Config::new();
        assert!(!config.ollama.base_url.is_empty());
        assert!(!config.ollama.model.is_empty());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("OLLAMA_MODEL", "  "), ("GMAIL_CREDENTIALS_PATH", "")]);
        assert_eq!(config.ollama.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.gmail.credentials_path, None);
    }
}
