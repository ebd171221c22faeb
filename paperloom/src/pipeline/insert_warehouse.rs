//! Terminal node: persist the flattened record into the warehouse.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkflowError;
use crate::graph::Node;
use crate::pipeline::{keys, INSERT_WAREHOUSE};
use crate::state::{Payload, PipelineState};
use crate::tasks::Warehouse;

/// Payload entries that are run bookkeeping, never record material.
const BOOKKEEPING_KEYS: [&str; 5] = [
    keys::FILE_NAME,
    keys::FILE,
    keys::PAPER_ID,
    keys::PROCESSED,
    keys::TEXT,
];

/// Persists the flattened record under `paper_id` and emits an empty update.
///
/// After `merge_results` the record fields (title, authors, keywords, ...)
/// sit at the top level of the payload. The node projects them out before
/// the warehouse call: bookkeeping entries and the namespaced enrichment
/// mappings stay inside the run, only record fields cross the boundary. Any
/// insert failure is fatal, partial ingestion must be visible.
pub struct InsertWarehouseNode {
    warehouse: Arc<dyn Warehouse>,
}

/// Record fields of the payload: everything except bookkeeping entries and
/// the mapping-valued enrichment records `merge_results` already flattened.
fn project_record(payload: &Payload) -> Payload {
    payload
        .iter()
        .filter(|(key, value)| !BOOKKEEPING_KEYS.contains(&key.as_str()) && !value.is_object())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl InsertWarehouseNode {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Node<PipelineState> for InsertWarehouseNode {
    fn id(&self) -> &str {
        INSERT_WAREHOUSE
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let paper_id = snapshot.require_str(INSERT_WAREHOUSE, keys::PAPER_ID)?;
        let record = project_record(&snapshot.state);
        self.warehouse
            .persist(paper_id, &record)
            .await
            .map_err(|e| WorkflowError::node(INSERT_WAREHOUSE, e))?;
        tracing::info!(paper_id = %paper_id, "Paper persisted to warehouse");
        Ok(PipelineState::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::TaskError;
    use crate::tasks::MockWarehouse;

    fn merged_state() -> PipelineState {
        PipelineState::update([
            (keys::FILE_NAME, json!("papers/a.pdf")),
            (keys::FILE, json!("JVBERi0xLjQ=")),
            (keys::PAPER_ID, json!("abc123")),
            (keys::PROCESSED, json!(false)),
            (keys::TEXT, json!("body")),
            (keys::METADATA, json!({"title": "T", "authors": ["A"]})),
            ("title", json!("T")),
            ("authors", json!(["A"])),
        ])
    }

    /// **Scenario**: the node persists exactly once under the paper id and
    /// emits an empty update.
    #[tokio::test]
    async fn persists_record_under_paper_id() {
        let warehouse = Arc::new(MockWarehouse::new());
        let node = InsertWarehouseNode::new(warehouse.clone());
        let update = node.run(merged_state()).await.unwrap();
        assert!(update.state.is_empty());

        let calls = warehouse.persisted();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abc123");
        assert_eq!(calls[0].1["title"], json!("T"));
    }

    /// **Scenario**: only record fields cross the warehouse boundary; the
    /// raw file payload, extracted text, run bookkeeping, and the namespaced
    /// enrichment mappings all stay inside the run.
    #[tokio::test]
    async fn bookkeeping_entries_never_reach_the_warehouse() {
        let warehouse = Arc::new(MockWarehouse::new());
        let node = InsertWarehouseNode::new(warehouse.clone());
        node.run(merged_state()).await.unwrap();

        let record = &warehouse.persisted()[0].1;
        for key in [
            keys::FILE_NAME,
            keys::FILE,
            keys::PAPER_ID,
            keys::PROCESSED,
            keys::TEXT,
            keys::METADATA,
        ] {
            assert!(!record.contains_key(key), "'{}' must not be persisted", key);
        }
        assert_eq!(record.len(), 2);
        assert_eq!(record["authors"], json!(["A"]));
    }

    /// **Scenario**: an insert failure is fatal with this node's identity.
    #[tokio::test]
    async fn insert_failure_is_fatal() {
        let warehouse =
            MockWarehouse::new().with_persist_error(TaskError::Insert("row rejected".into()));
        let node = InsertWarehouseNode::new(Arc::new(warehouse));
        let err = node.run(merged_state()).await.unwrap_err();
        match err {
            WorkflowError::NodeFailed { node, source } => {
                assert_eq!(node, INSERT_WAREHOUSE);
                assert!(matches!(source, TaskError::Insert(_)));
            }
            other => panic!("expected NodeFailed, got {:?}", other),
        }
    }
}
