//! Shared pipeline state: one payload mapping, merged by a pure reducer.
//!
//! Every node reads a snapshot of [`PipelineState`] and returns a *partial*
//! state holding only the keys it produced. The executor folds partial updates
//! into the shared state with [`merge`]: shallow, last-writer-wins per key.
//! Keys are namespaced by convention to the producing node (`file`,
//! `paper_id`, `processed`, `text`, `metadata`, `research`, `summary`);
//! concurrent nodes must write disjoint keys, which the fixed topology upholds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WorkflowError;

/// The payload mapping accumulated across one workflow run.
pub type Payload = Map<String, Value>;

/// Shared state for the ingestion pipeline.
///
/// Wraps the payload under a single well-known field, mirroring the shape the
/// reducer operates on. Created empty at workflow start, discarded when the
/// run terminates; nodes never mutate it in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Namespaced results produced so far.
    pub state: Payload,
}

impl PipelineState {
    /// Empty state for the start of a run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a partial update from `(key, value)` pairs.
    pub fn update(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        let mut state = Payload::new();
        for (k, v) in entries {
            state.insert(k.to_string(), v);
        }
        Self { state }
    }

    /// Reads a payload key, or raises the missing-input envelope for `node`.
    ///
    /// Upstream omission is a topology bug and must fail loudly; callers never
    /// default a missing key.
    pub fn require(&self, node: &str, key: &str) -> Result<&Value, WorkflowError> {
        self.state
            .get(key)
            .ok_or_else(|| WorkflowError::missing_input(node, key))
    }

    /// Reads a payload key as a string, raising missing-input when absent and
    /// an execution error when the value has the wrong shape.
    pub fn require_str(&self, node: &str, key: &str) -> Result<&str, WorkflowError> {
        self.require(node, key)?.as_str().ok_or_else(|| {
            WorkflowError::ExecutionFailed(format!(
                "node '{node}' expected string payload entry '{key}'"
            ))
        })
    }
}

/// Pure shallow-merge reducer: every key in `update` overwrites the same key
/// in `payload`; keys only in `payload` are preserved; nested values are not
/// deep-merged.
///
/// Returns a new mapping and never mutates its inputs, so the executor can
/// apply it in any serial order as concurrent branches complete. Total over
/// all mapping inputs; with disjoint updates it is order-independent.
pub fn merge(payload: &Payload, update: &Payload) -> Payload {
    let mut merged = payload.clone();
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
