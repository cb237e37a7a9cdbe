//! # Research Email Agent
//!
//! A two-step CLI pipeline: research a topic on the web (DuckDuckGo →
//! Wikipedia → optional Serper fallback chain), then ask a hosted LLM to
//! draft a short email summarizing the findings for a non-technical reader.
//!
//! ## Quick Start
//! ```bash
//! export GEMINI_API_KEY=...
//! cargo run -- "Quantum Computing"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================
/// Pipeline orchestration
mod agent;

/// Email drafting against the hosted model
mod compose;

/// Configuration management
mod config;

/// Fire-and-forget evaluation telemetry
mod judge;

/// Web search fallback chain
mod search;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::agent::ResearchAgent;
use crate::config::Config;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "research-email-agent",
    version,
    about = "Researches a topic on the web and drafts a short summary email",
    long_about = r#"
Research Email Agent

Gathers a plaintext research summary for a topic (DuckDuckGo instant
answers, falling back to Wikipedia, falling back to Serper when
SERPER_API_KEY is set) and asks a hosted Gemini model to compose a
stakeholder-friendly email about it.

CONFIGURATION (environment / .env):
  GEMINI_API_KEY   required
  MODEL_NAME       optional, defaults to gemini-2.0-flash
  SERPER_API_KEY   optional, enables the Serper fallback
  TEMPERATURE      optional, defaults to 0.3

EXAMPLES:
  research-email-agent "Quantum Computing"
  research-email-agent --model gemini-2.0-flash Rust async runtimes
"#
)]
struct Args {
    /// The topic to research; multiple words are joined with spaces.
    #[arg(value_name = "TOPIC", required = true, num_args = 1..)]
    topic: Vec<String>,

    /// Hosted model to use (overrides MODEL_NAME).
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Enable verbose/debug logging.
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    // Clap exits non-zero with a usage message when the topic is missing,
    // before any configuration or network activity.
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("research-email-agent starting up");

    // Required configuration is resolved before any outbound call.
    let mut config = Config::from_env()?;

    if let Some(model) = args.model {
        info!(model = %model, "Using model from command line");
        config.model = model;
    }
    config.validate()?;

    info!(model = %config.model, "Configuration loaded");

    let topic = args.topic.join(" ");
    let agent = ResearchAgent::new(&config)?;

    match agent.run(&topic).await {
        Ok(email) => {
            println!("\n=== Draft Email ===\n");
            println!("{email}");
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            eprintln!("\nResearch failed: {e:#}");
            return Err(e);
        }
    }

    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber. `RUST_LOG` wins over the verbose flag.
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
