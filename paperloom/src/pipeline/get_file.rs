//! Pipeline entry: download the object and fingerprint it.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::error::WorkflowError;
use crate::graph::Node;
use crate::hash::hash_bytes;
use crate::pipeline::{keys, GET_FILE};
use crate::state::PipelineState;
use crate::tasks::ObjectStore;

/// Downloads the named object and derives the paper's content hash.
///
/// Emits `file` (base64 bytes) and `paper_id`. The hash is computed from the
/// raw bytes before any parsing, so the identity of a paper is stable even
/// when text extraction changes.
pub struct GetFileNode {
    store: Arc<dyn ObjectStore>,
}

impl GetFileNode {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Node<PipelineState> for GetFileNode {
    fn id(&self) -> &str {
        GET_FILE
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let name = snapshot.require_str(GET_FILE, keys::FILE_NAME)?;
        tracing::info!(object = name, "Downloading object");
        let bytes = self
            .store
            .fetch_bytes(name)
            .await
            .map_err(|e| WorkflowError::node(GET_FILE, e))?;
        let paper_id = hash_bytes(&bytes);
        tracing::info!(paper_id = %paper_id, size = bytes.len(), "Object downloaded");
        Ok(PipelineState::update([
            (keys::FILE, Value::String(STANDARD.encode(&bytes))),
            (keys::PAPER_ID, Value::String(paper_id)),
        ]))
    }
}
