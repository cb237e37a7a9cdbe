//! # Agent Module
//!
//! The pipeline orchestrator: resolve research text through the search
//! fallback chain, draft an email from it, report the pair to the
//! evaluation collaborator, return the draft.
//!
//! Search failures were already absorbed upstream (the research step always
//! yields text, possibly the sentinel); composition failures propagate.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, instrument};

use crate::compose::{ComposeError, EmailDraftTool, GeminiClient};
use crate::config::Config;
use crate::judge::JudgmentClient;
use crate::search::WebSearchTool;

/// Per-request budget for the search providers.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The research → email pipeline.
pub struct ResearchAgent {
    search: WebSearchTool,
    email: EmailDraftTool,
    judgment: JudgmentClient,
}

impl ResearchAgent {
    /// Wire up the production pipeline from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let search = WebSearchTool::new(http.clone());
        let model = GeminiClient::new(config).context("failed to build Gemini client")?;
        let email = EmailDraftTool::new(Box::new(model));
        let judgment = JudgmentClient::from_env(http);

        Ok(Self {
            search,
            email,
            judgment,
        })
    }

    /// Assemble a pipeline from pre-built collaborators.
    pub fn from_parts(
        search: WebSearchTool,
        email: EmailDraftTool,
        judgment: JudgmentClient,
    ) -> Self {
        Self {
            search,
            email,
            judgment,
        }
    }

    #[instrument(skip(self))]
    async fn research_step(&self, topic: &str) -> String {
        self.search.run(topic).await
    }

    #[instrument(skip(self, research))]
    async fn draft_email_step(&self, research: &str) -> Result<String, ComposeError> {
        self.email.run(research).await
    }

    /// End-to-end: topic in, email draft out.
    pub async fn run(&self, topic: &str) -> Result<String> {
        info!(topic = %topic, "Starting research-email pipeline");

        let research = self.research_step(topic).await;
        let email = self
            .draft_email_step(&research)
            .await
            .context("email composition failed")?;

        // Best-effort quality score; never blocks or fails the run.
        self.judgment.async_evaluate(research, email.clone());

        info!("Pipeline completed");
        Ok(email)
    }
}
