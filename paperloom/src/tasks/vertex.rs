//! Vertex AI model client.
//!
//! Talks to the Vertex AI OpenAPI chat-completions endpoint (the serving
//! surface for the hosted Llama models). One prompt, one completion,
//! temperature 0; the per-request timeout fails a stalled call fast.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::TaskError;
use crate::tasks::LlmClient;

/// Chat-completions client for a model served on Vertex AI.
pub struct VertexLlm {
    client: reqwest::Client,
    base_url: String,
    project: String,
    location: String,
    model: String,
    access_token: String,
}

impl VertexLlm {
    /// Builds a client for `model` in `project`/`location`.
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TaskError> {
        let location = location.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskError::Llm(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("https://{location}-aiplatform.googleapis.com"),
            project: project.into(),
            location,
            model: model.into(),
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
impl LlmClient for VertexLlm {
    async fn generate(&self, prompt: &str) -> Result<String, TaskError> {
        tracing::debug!(model = %self.model, "Sending prompt to Vertex AI");
        let url = format!(
            "{}/v1/projects/{}/locations/{}/endpoints/openapi/chat/completions",
            self.base_url, self.project, self.location
        );
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::Llm(format!("model request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(TaskError::Llm(format!(
                "model request failed: HTTP {}",
                response.status()
            )));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| TaskError::Llm(format!("bad model reply: {e}")))?;
        reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TaskError::Llm("model reply had no message content".into()))
    }
}
