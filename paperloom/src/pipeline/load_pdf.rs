//! Text extraction: decode the downloaded bytes and pull plain text out.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::error::{TaskError, WorkflowError};
use crate::graph::Node;
use crate::pdf::extract_text_from_pdf;
use crate::pipeline::{keys, LOAD_PDF};
use crate::state::PipelineState;

/// Emits `text` extracted from the base64 `file` payload.
///
/// A malformed payload or unreadable PDF is fatal; an empty text body is not,
/// the enrichment nodes handle it downstream.
pub struct LoadPdfNode;

#[async_trait]
impl Node<PipelineState> for LoadPdfNode {
    fn id(&self) -> &str {
        LOAD_PDF
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let encoded = snapshot.require_str(LOAD_PDF, keys::FILE)?;
        let bytes = STANDARD.decode(encoded).map_err(|e| {
            WorkflowError::node(
                LOAD_PDF,
                TaskError::Extraction(format!("invalid base64 file payload: {e}")),
            )
        })?;
        let text = extract_text_from_pdf(&bytes).map_err(|e| WorkflowError::node(LOAD_PDF, e))?;
        tracing::info!(chars = text.len(), "Extracted text from PDF");
        Ok(PipelineState::update([(keys::TEXT, Value::String(text))]))
    }
}
