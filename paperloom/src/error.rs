//! Workflow error types.
//!
//! `TaskError` covers failures inside collaborator calls (storage, warehouse,
//! model, hashing, PDF extraction). `WorkflowError` is the uniform envelope a
//! node raises to the executor: it always carries the node id, so a failed run
//! reports which node broke and why.

use thiserror::Error;

/// Failure from an external collaborator or a pure task helper.
///
/// Raised inside node bodies and wrapped into [`WorkflowError::NodeFailed`]
/// before reaching the executor.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Object storage download failed (network, auth, missing object).
    #[error("storage error: {0}")]
    Storage(String),

    /// The byte stream is not a readable PDF.
    #[error("pdf extraction error: {0}")]
    Extraction(String),

    /// Warehouse existence query failed.
    #[error("warehouse query error: {0}")]
    Query(String),

    /// Warehouse insert failed (including per-row insert errors).
    #[error("warehouse insert error: {0}")]
    Insert(String),

    /// Model request failed (network, HTTP status, malformed response).
    #[error("llm request error: {0}")]
    Llm(String),

    /// Content hashing rejected the input (empty or whitespace-only string).
    #[error("hash error: {0}")]
    Hash(String),
}

/// Uniform failure envelope raised by nodes and surfaced by the executor.
///
/// Every node-internal error is wrapped with the node's identity before it
/// propagates; the executor treats any variant as fatal for the run, aborts
/// scheduling, and re-raises it to the caller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A collaborator call inside the named node failed.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        /// Graph-unique id of the failing node.
        node: String,
        /// Underlying cause, preserved for diagnostics.
        #[source]
        source: TaskError,
    },

    /// The named node read a payload key its predecessors never produced.
    /// Always a topology/ordering bug, never a data condition.
    #[error("node '{node}' missing required input '{key}'")]
    MissingInput { node: String, key: String },

    /// Executor-level failure (empty graph, unknown routing label, panicked task).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl WorkflowError {
    /// Wraps a task failure with the node's identity.
    pub fn node(node: impl Into<String>, source: TaskError) -> Self {
        WorkflowError::NodeFailed {
            node: node.into(),
            source,
        }
    }

    /// Missing-input envelope for the given node and payload key.
    pub fn missing_input(node: impl Into<String>, key: impl Into<String>) -> Self {
        WorkflowError::MissingInput {
            node: node.into(),
            key: key.into(),
        }
    }
}
