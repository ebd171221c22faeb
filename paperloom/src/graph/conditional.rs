//! Conditional edges: route to the next node based on state.
//!
//! A source node pairs with a routing function `(state) -> label`; the label
//! is looked up in a path map of `label -> node id (or END)`. The router is a
//! plain pure function, so routing policy is unit-testable without building a
//! graph.
//!
//! **Interaction**: registered via `StateGraph::add_conditional_edges`;
//! resolved by the `CompiledStateGraph` run loop after the source node's
//! update has been merged.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::WorkflowError;

/// Router function: takes a reference to state and returns a routing label.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge definition: routing function plus the label-to-node map.
///
/// The path map is mandatory: the compiler needs the full static target set to
/// validate the topology and pre-compute fan-in counts. A label the map does
/// not know is a run-time execution error.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    path: ConditionalRouterFn<S>,
    pub(super) path_map: HashMap<String, String>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Builds a conditional router from `path` and its label map.
    pub fn new(path: ConditionalRouterFn<S>, path_map: HashMap<String, String>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    pub fn resolve_next(&self, state: &S) -> Result<String, WorkflowError> {
        let label = (self.path)(state);
        self.path_map.get(&label).cloned().ok_or_else(|| {
            WorkflowError::ExecutionFailed(format!(
                "conditional router returned unknown label '{label}'"
            ))
        })
    }

    /// Possible destinations of this edge, as declared in the path map.
    pub(super) fn targets(&self) -> impl Iterator<Item = &String> {
        self.path_map.values()
    }
}
