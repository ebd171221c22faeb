//! Google Cloud Storage object store client.
//!
//! Downloads objects through the JSON API media endpoint with a bearer token.
//! One HTTP call per fetch; the per-request timeout comes from configuration
//! so a stalled download fails fast into the node's failure path.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::ObjectStore;

/// Object store backed by the GCS JSON API.
pub struct GcsObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_token: String,
}

impl GcsObjectStore {
    /// Builds a client for `bucket` with the given bearer token and timeout.
    pub fn new(
        bucket: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskError::Storage(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: "https://storage.googleapis.com".to_string(),
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }

    /// Overrides the API base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn fetch_bytes(&self, name: &str) -> Result<Vec<u8>, TaskError> {
        tracing::info!(object = name, bucket = %self.bucket, "Downloading file from Cloud Storage");
        let url = format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            self.bucket,
            urlencoding::encode(name)
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| TaskError::Storage(format!("failed to download '{name}': {e}")))?;
        if !response.status().is_success() {
            return Err(TaskError::Storage(format!(
                "failed to download '{name}': HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TaskError::Storage(format!("failed to read body of '{name}': {e}")))?;
        Ok(bytes.to_vec())
    }
}
