//! Pipeline configuration, loaded once from the process environment.
//!
//! A project `.env` file is applied first (existing environment wins, as
//! `dotenv` never overrides), then the typed [`PipelineConfig`] is read out.
//! The struct is built at process start and passed by reference; nothing here
//! is global or mutable after load.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Required variable names.
pub const GOOGLE_PROJECT_ID: &str = "GOOGLE_PROJECT_ID";
pub const GOOGLE_LOCATION: &str = "GOOGLE_LOCATION";
pub const GOOGLE_STORAGE_BUCKET_NAME: &str = "GOOGLE_STORAGE_BUCKET_NAME";
pub const BIGQUERY_DATASET_ID: &str = "BIGQUERY_DATASET_ID";
pub const VERTEX_AI_MODEL: &str = "VERTEX_AI_MODEL";
pub const GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";

/// Optional; defaults to 60.
pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable '{0}'")]
    MissingVar(String),
    #[error("invalid value for '{key}': {message}")]
    InvalidVar { key: String, message: String },
}

/// Everything the pipeline needs to talk to Google Cloud.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub google_project_id: String,
    pub google_location: String,
    pub google_storage_bucket_name: String,
    pub bigquery_dataset_id: String,
    pub vertex_ai_model: String,
    pub google_access_token: String,
    pub request_timeout_secs: u64,
}

impl PipelineConfig {
    /// Loads `.env` (if present) and reads the config from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    /// Reads the config from an explicit map. Used by `from_env` and by
    /// tests, which must not touch the process environment.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |key: &str| -> Result<String, ConfigError> {
            match vars.get(key).map(String::as_str).map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(ConfigError::MissingVar(key.to_string())),
            }
        };

        let request_timeout_secs = match vars.get(REQUEST_TIMEOUT_SECS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidVar {
                    key: REQUEST_TIMEOUT_SECS.to_string(),
                    message: e.to_string(),
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            google_project_id: required(GOOGLE_PROJECT_ID)?,
            google_location: required(GOOGLE_LOCATION)?,
            google_storage_bucket_name: required(GOOGLE_STORAGE_BUCKET_NAME)?,
            bigquery_dataset_id: required(BIGQUERY_DATASET_ID)?,
            vertex_ai_model: required(VERTEX_AI_MODEL)?,
            google_access_token: required(GOOGLE_ACCESS_TOKEN)?,
            request_timeout_secs,
        })
    }

    /// Per-request timeout applied to every outbound HTTP call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
