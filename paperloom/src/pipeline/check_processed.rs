//! Dedup gate: ask the warehouse whether the paper was already ingested.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::graph::Node;
use crate::pipeline::{keys, CHECK_PROCESSED};
use crate::state::PipelineState;
use crate::tasks::Warehouse;

/// Emits `processed: bool` from a warehouse existence query on `paper_id`.
///
/// The conditional edge after this node reads the flag; a query failure is
/// fatal for the run, since reprocessing a paper we cannot check for would
/// risk duplicate warehouse rows.
pub struct CheckProcessedNode {
    warehouse: Arc<dyn Warehouse>,
}

impl CheckProcessedNode {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Node<PipelineState> for CheckProcessedNode {
    fn id(&self) -> &str {
        CHECK_PROCESSED
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let paper_id = snapshot.require_str(CHECK_PROCESSED, keys::PAPER_ID)?;
        let exists = self
            .warehouse
            .paper_exists(paper_id)
            .await
            .map_err(|e| WorkflowError::node(CHECK_PROCESSED, e))?;
        tracing::info!(paper_id = %paper_id, processed = exists, "Dedup check complete");
        Ok(PipelineState::update([(
            keys::PROCESSED,
            Value::Bool(exists),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::TaskError;
    use crate::tasks::MockWarehouse;

    fn state_with_paper_id() -> PipelineState {
        PipelineState::update([(keys::PAPER_ID, json!("abc123"))])
    }

    /// **Scenario**: a known paper flags processed = true.
    #[tokio::test]
    async fn known_paper_is_flagged_processed() {
        let node = CheckProcessedNode::new(Arc::new(MockWarehouse::new().with_existing_paper()));
        let update = node.run(state_with_paper_id()).await.unwrap();
        assert_eq!(update.state[keys::PROCESSED], json!(true));
    }

    /// **Scenario**: an unknown paper flags processed = false.
    #[tokio::test]
    async fn unknown_paper_is_flagged_unprocessed() {
        let node = CheckProcessedNode::new(Arc::new(MockWarehouse::new()));
        let update = node.run(state_with_paper_id()).await.unwrap();
        assert_eq!(update.state[keys::PROCESSED], json!(false));
    }

    /// **Scenario**: a query failure is fatal and carries this node's identity.
    #[tokio::test]
    async fn query_failure_is_fatal() {
        let warehouse = MockWarehouse::new().with_query_error(TaskError::Query("timeout".into()));
        let node = CheckProcessedNode::new(Arc::new(warehouse));
        let err = node.run(state_with_paper_id()).await.unwrap_err();
        match err {
            WorkflowError::NodeFailed { node, source } => {
                assert_eq!(node, CHECK_PROCESSED);
                assert!(matches!(source, TaskError::Query(_)));
            }
            other => panic!("expected NodeFailed, got {:?}", other),
        }
    }
}
