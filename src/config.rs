//! # Configuration Module
//!
//! Loads configuration from environment variables (with optional `.env`
//! support for local development).
//!
//! Two tiers of configuration exist here:
//! - Startup configuration (`Config::from_env`): the Gemini credential is
//!   required and missing it aborts the process before any network activity.
//! - Call-time configuration (`serper_api_key`): the optional Serper
//!   credential is read freshly at the point of use, never cached, so the
//!   provider can be toggled on/off between pipeline runs.

use anyhow::{Context, Result};
use std::env;

/// Default hosted model when MODEL_NAME is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default sampling temperature. Low randomness keeps email drafts consistent.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Environment variable holding the optional Serper search credential.
pub const SERPER_API_KEY_VAR: &str = "SERPER_API_KEY";

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the research-email pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API credential. Required.
    pub api_key: String,

    /// The hosted model to use (e.g., "gemini-2.0-flash").
    pub model: String,

    /// Temperature for LLM responses (0.0 = deterministic).
    pub temperature: f32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails fast with a clear message if `GEMINI_API_KEY` is absent —
    /// composing email without a model credential is never going to work,
    /// so the process should stop before touching the network.
    pub fn from_env() -> Result<Self> {
        // Load .env if present; silently ignore if not.
        let _ = dotenvy::dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY not set - check your environment or .env file")?;

        let model = env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = match env::var("TEMPERATURE") {
            Ok(val) => val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.3)")?,
            Err(_) => DEFAULT_TEMPERATURE,
        };

        let config = Self {
            api_key,
            model,
            temperature,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration before the pipeline starts.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("GEMINI_API_KEY cannot be empty");
        }

        if self.model.is_empty() {
            anyhow::bail!("MODEL_NAME cannot be empty");
        }

        // Gemini accepts 0.0..=2.0.
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        Ok(())
    }
}

// =============================================================================
// CALL-TIME ACCESSORS
// =============================================================================
/// Read the optional Serper credential from the given environment variable.
///
/// Read at call time rather than memoized at startup: absence (or an empty
/// value) disables the Serper provider for that call only.
pub fn serper_api_key_from(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(key) if !key.is_empty() => Some(key),
        _ => None,
    }
}

/// Read the optional Serper credential from `SERPER_API_KEY`.
#[allow(dead_code)] // Convenience wrapper; providers take the var name explicitly.
pub fn serper_api_key() -> Option<String> {
    serper_api_key_from(SERPER_API_KEY_VAR)
}
