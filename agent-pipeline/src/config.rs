//! Service configuration
//!
//! `.env` is loaded first (by `main`), then plain environment variables win.

use std::env;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

/// Model used when `AGENT_PIPELINE_MODEL` is unset.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub db_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| PipelineError::validation("ANTHROPIC_API_KEY is not set"))?;

        let model = env::var("AGENT_PIPELINE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let db_path = match env::var("AGENT_PIPELINE_DB") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_db_path()?,
        };

        Ok(Self {
            api_key,
            model,
            db_path,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PipelineError::Internal("cannot determine home directory".to_string()))?;
    Ok(home.join(".agent-pipeline").join("pipeline.db"))
}
