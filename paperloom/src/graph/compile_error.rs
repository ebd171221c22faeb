//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the declared topology is invalid.
//! Every topology defect is rejected at build time; the run loop never
//! discovers a structural error.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Validation ensures node ids are unique, every id referenced by an edge
/// (except START/END) is registered, no edge is declared twice, exactly one
/// edge leaves START, the graph
/// is acyclic, END is reachable from the start node, and no node mixes an
/// unconditional outgoing edge with conditional edges.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// The same node id was registered twice via `add_node`.
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The same `(from, to)` edge was declared twice. Fan-in counts expect one
    /// completion per declared edge, so a repeated edge can never be satisfied.
    #[error("duplicate edge from '{from}' to '{to}'")]
    DuplicateEdge { from: String, to: String },

    /// No edge has from_id == START, or more than one such edge.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// Neither edges nor conditional path maps ever reach END.
    #[error("graph must have at least one edge to END")]
    MissingEnd,

    /// END exists but cannot be reached from the start node.
    #[error("no path from start to END")]
    UnreachableEnd,

    /// The declared edges contain a cycle; the graph must be a DAG.
    #[error("cycle detected in graph edges")]
    CycleDetected,

    /// A node has both an outgoing edge and conditional edges; it must have one kind.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),
}
