//! Structured logging for graph execution events.
//!
//! Thin tracing helpers so the run loop stays readable; node lifecycle at
//! debug level, run lifecycle at info, failures at error.

use std::fmt::Debug;

use crate::error::WorkflowError;

/// Log node execution start.
pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id = node_id, "Starting node execution");
}

/// Log the state snapshot a node is about to run against.
pub fn log_node_state<S: Debug>(node_id: &str, state: &S) {
    tracing::debug!(node_id = node_id, state = ?state, "Node execution: state");
}

/// Log node execution completion.
pub fn log_node_complete(node_id: &str) {
    tracing::debug!(node_id = node_id, "Node execution complete");
}

/// Log that a node's partial update was merged into shared state.
pub fn log_state_update(node_id: &str) {
    tracing::debug!(node_id = node_id, "State updated");
}

/// Log workflow run start.
pub fn log_graph_start() {
    tracing::info!("Starting graph execution");
}

/// Log workflow run completion.
pub fn log_graph_complete() {
    tracing::info!("Graph execution complete");
}

/// Log workflow run failure.
pub fn log_graph_error(error: &WorkflowError) {
    tracing::error!(?error, "Graph execution error");
}
