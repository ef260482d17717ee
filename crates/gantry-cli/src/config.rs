//! CLI configuration, read from the environment.

use gantry_core::{Error, Result};
use std::path::PathBuf;

/// Runtime configuration shared by the subcommands. `DATABASE_URL` is
/// required; everything else has a workable default. `dotenvy` has already
/// populated the environment from `.env` by the time this runs.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_url: String,
    pub artifact_root: PathBuf,
    pub base_url: String,
    pub webhook_url: Option<String>,
    pub recipient: String,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Internal("DATABASE_URL is not set".to_string()))?;

        Ok(Self {
            database_url,
            artifact_root: std::env::var("GANTRY_ARTIFACT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/www/ci")),
            base_url: std::env::var("GANTRY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost/ci".to_string()),
            webhook_url: std::env::var("GANTRY_WEBHOOK_URL").ok(),
            recipient: std::env::var("GANTRY_NOTIFY_RECIPIENT")
                .unwrap_or_else(|_| "ci-results".to_string()),
        })
    }

    /// The webhook URL, required for the notify subcommand.
    pub fn require_webhook_url(&self) -> Result<&str> {
        self.webhook_url
            .as_deref()
            .ok_or_else(|| Error::Internal("GANTRY_WEBHOOK_URL is not set".to_string()))
    }
}
