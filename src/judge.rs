//! # Judge Module
//!
//! Best-effort quality telemetry: after each run, the research text and the
//! composed email are posted to an external evaluation service together
//! with a named scorer and threshold. The call is fire-and-forget — it is
//! spawned on a detached task, swallows its own errors, and can never block
//! or fail the pipeline.

use serde_json::json;
use tracing::{debug, warn};

/// Project name reported with every evaluation.
pub const PROJECT_NAME: &str = "research-email-agent";

/// Evaluation criterion and acceptance threshold.
const SCORER: &str = "answer_relevancy";
const THRESHOLD: f64 = 0.5;

/// Judge model asked to produce the score.
const JUDGE_MODEL: &str = "gpt-4o-mini";

/// Client for the external evaluation collaborator.
///
/// The endpoint comes from `JUDGMENT_API_URL`; when unset, telemetry is a
/// silent no-op rather than an error.
#[derive(Debug, Clone)]
pub struct JudgmentClient {
    client: reqwest::Client,
    endpoint: Option<String>,
    project: String,
}

impl JudgmentClient {
    pub fn from_env(client: reqwest::Client) -> Self {
        let endpoint = std::env::var("JUDGMENT_API_URL")
            .ok()
            .filter(|url| !url.is_empty());

        Self {
            client,
            endpoint,
            project: PROJECT_NAME.to_string(),
        }
    }

    /// A client with no endpoint configured; every call is a no-op.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: None,
            project: PROJECT_NAME.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Submit an evaluation without waiting for it. Failures are logged at
    /// `warn!` inside the spawned task and go no further.
    pub fn async_evaluate(&self, input: String, actual_output: String) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.evaluate(&input, &actual_output).await {
                warn!(error = %e, "Evaluation telemetry failed");
            }
        });
    }

    /// The awaitable submission; [`Self::async_evaluate`] wraps this.
    pub async fn evaluate(&self, input: &str, actual_output: &str) -> Result<(), reqwest::Error> {
        let Some(endpoint) = &self.endpoint else {
            debug!("No evaluation endpoint configured, skipping telemetry");
            return Ok(());
        };

        let payload = json!({
            "project_name": self.project,
            "scorer": SCORER,
            "threshold": THRESHOLD,
            "model": JUDGE_MODEL,
            "input": input,
            "actual_output": actual_output,
        });

        self.client
            .post(endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        debug!("Evaluation telemetry submitted");
        Ok(())
    }
}
