//! Fan-in: flatten the namespaced enrichment records into one flat mapping.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::graph::Node;
use crate::pipeline::MERGE_RESULTS;
use crate::state::{Payload, PipelineState};

/// Flattens every mapping-valued payload entry into one flat record.
///
/// Scalar and list entries (`file_name`, `text`, `processed`, ...) are not
/// record material and are skipped. Duplicate inner keys resolve last-writer-
/// wins in key order; the three enrichment schemas are disjoint, so in
/// practice nothing collides. The flat union is the partial update, so the
/// reducer lands the record fields at the top level of the shared payload
/// where `insert_warehouse` reads them.
pub struct MergeResultsNode;

#[async_trait]
impl Node<PipelineState> for MergeResultsNode {
    fn id(&self) -> &str {
        MERGE_RESULTS
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let mut flat = Payload::new();
        for value in snapshot.state.values() {
            if let Value::Object(record) = value {
                for (key, inner) in record {
                    flat.insert(key.clone(), inner.clone());
                }
            }
        }
        tracing::info!(fields = flat.len(), "Merged enrichment results");
        Ok(PipelineState { state: flat })
    }
}
