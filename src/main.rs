use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use log::{info, error};

use meetmail::config::Config;
use meetmail::datetime_extractor::{format_reference, local_reference_time};
use meetmail::email::EmlMailbox;
use meetmail::gmail_client::GmailClient;
use meetmail::llm::OllamaClient;
use meetmail::mailbox::Mailbox;
use meetmail::pipeline::{meeting_summary, run_pipeline, PipelineOptions, PipelineOutcome, NO_MESSAGES_ERROR};

#[derive(Parser)]
#[command(name = "meetmail")]
#[command(about = "Classify the scheduling intent of your newest email and extract the meeting time")]
#[command(version = "0.1.0")]
struct Args {
    /// Read the message from a local .eml file instead of Gmail
    #[arg(long, value_name = "PATH")]
    eml: Option<String>,

    /// Gmail label ID that scopes "newest message" (default: INBOX)
    #[arg(short, long)]
    label: Option<String>,

    /// Search all mail instead of a single label
    #[arg(long, conflicts_with = "label")]
    all_mail: bool,

    /// Resolve relative dates against this RFC 3339 time instead of now
    #[arg(long, value_name = "RFC3339")]
    reference_time: Option<String>,

    /// Ollama model name (overrides OLLAMA_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Check the configuration without connecting
    #[arg(long)]
    check_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    info!("🚀 Starting meetmail");

    let mut config = Config::new();

    // CLI arguments take precedence over the environment
    if let Some(model) = &args.model {
        config.ollama.model = model.clone();
    }
    if let Some(label) = &args.label {
        config.mailbox_label = Some(label.clone());
    }
    if args.all_mail {
        config.mailbox_label = None;
    }

    if args.check_config {
        return check_config(&config, &args);
    }

    let reference = match &args.reference_time {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Invalid --reference-time '{}', expected RFC 3339", value))?,
        None => local_reference_time(),
    };
    info!("⏱️  Reference time: {}", format_reference(&reference));

    let mailbox: Box<dyn Mailbox> = match &args.eml {
        Some(path) => Box::new(EmlMailbox::open(path)?),
        None => {
            let credentials_path = config.require_gmail_credentials()?;
            Box::new(GmailClient::new(&config.gmail, credentials_path).await?)
        }
    };

    let model = OllamaClient::new(&config.ollama)?;

    let options = PipelineOptions {
        label: config.mailbox_label.clone(),
        reference,
    };

    let outcome = match run_pipeline(mailbox.as_ref(), &model, &options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("❌ Error while processing the newest email: {:#}", e);
            return Err(e);
        }
    };

    let report = match outcome {
        PipelineOutcome::EmptyMailbox => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "error": NO_MESSAGES_ERROR }))?);
            return Ok(());
        }
        PipelineOutcome::Processed(report) => report,
    };

    println!("{}", "=".repeat(80));
    println!("📧 Message");
    println!("{}", "=".repeat(80));
    println!("{}", serde_json::to_string_pretty(&report.message)?);

    println!("\n🤖 Classifier reply:\n{}", report.classifier_reply);
    println!("\n🏷️  Classification:\n{}", serde_json::to_string_pretty(&report.classification)?);

    if let Some(meeting) = &report.meeting {
        println!("\n🗓️  Meeting time:\n{}", serde_json::to_string_pretty(meeting)?);
        println!("\n{}", meeting_summary(meeting));
    }

    info!("✅ Done");
    Ok(())
}

fn check_config(config: &Config, args: &Args) -> Result<()> {
    println!("✅ Configuration loaded");
    match &args.eml {
        Some(path) => println!("📄 Message source: {}", path),
        None => {
            println!("📧 Gmail API OAuth2");
            println!("🔑 Credentials: {}", config.gmail.credentials_path.as_deref().unwrap_or("(not set)"));
            println!("💾 Token cache: {}", config.gmail.token_cache_path);
            println!("🏷️  Label scope: {}", config.mailbox_label.as_deref().unwrap_or("(all mail)"));
        }
    }
    println!("🤖 Ollama: {} at {}", config.ollama.model, config.ollama.base_url);

    if args.eml.is_none() {
        config.require_gmail_credentials()?;
    }
    Ok(())
}
