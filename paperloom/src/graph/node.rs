//! Graph node trait: one unit of work in a workflow graph.
//!
//! A node receives a read-only snapshot of the current state and returns a
//! *partial* state update (or the failure envelope). Routing is never decided
//! by the node: the executor follows the graph's edges, conditional routers
//! included, so node logic stays uniform and the topology stays visible in
//! one place.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::WorkflowError;

/// One step in a graph: snapshot in, partial update out.
///
/// Constructed once at graph-build time and invoked exactly once per run.
/// Implementations must not mutate the snapshot; they return a new state
/// carrying only the keys they produced, which the executor merges through
/// the configured state updater.
///
/// **Interaction**: registered via `StateGraph::add_node` as
/// `Arc<dyn Node<S>>`; run by `CompiledStateGraph::invoke`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"load_pdf"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// Runs the node against a snapshot of the current state.
    ///
    /// Errors are wrapped in the [`WorkflowError`] envelope with this node's
    /// identity; any error aborts the whole run.
    async fn run(&self, snapshot: S) -> Result<S, WorkflowError>;
}
