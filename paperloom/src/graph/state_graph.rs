//! State graph builder: nodes plus explicit edges (from → to) and conditional edges.
//!
//! Add nodes with `add_node`, wire the topology with `add_edge(from, to)`
//! using `START` and `END` for graph entry/exit, and `add_conditional_edges`
//! for state-based routing. Fan-out (several edges from one node) and fan-in
//! (several edges into one node) are permitted; the graph must stay a DAG.
//! Then `compile()` to obtain an immutable, reusable `CompiledStateGraph`.
//!
//! # Conditional edges
//!
//! From a source node, a routing function `(state) -> label` is called after
//! the node's update has been merged; the label is looked up in the mandatory
//! path map. A node must have either outgoing `add_edge`s or
//! `add_conditional_edges`, not both.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use crate::channels::{BoxedStateUpdater, ReplaceUpdater};
use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn};
use crate::graph::node::Node;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)` or
/// as a conditional path-map target.
pub const END: &str = "__end__";

/// Builder for a workflow graph over state type `S`.
///
/// **Interaction**: accepts `Arc<dyn Node<S>>`; `compile()` validates the
/// topology (duplicate ids, dangling edges, start/end, cycles) and produces a
/// `CompiledStateGraph<S>`. One build, many runs.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Ids registered more than once; reported at compile time.
    duplicate_ids: Vec<String>,
    /// Edges (from_id, to_id). Several edges may share a from (fan-out) or a to (fan-in).
    edges: Vec<(String, String)>,
    /// Conditional edges: source node id -> router. Resolved from state at run time.
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    /// Controls how node outputs fold into shared state. Default replaces the state.
    state_updater: Option<BoxedStateUpdater<S>>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            duplicate_ids: Vec::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            state_updater: None,
        }
    }

    /// Attaches a custom state updater (e.g. the payload merge reducer).
    ///
    /// Default is `ReplaceUpdater`, which fully replaces the state with each
    /// node's output.
    pub fn with_state_updater(self, updater: BoxedStateUpdater<S>) -> Self {
        Self {
            state_updater: Some(updater),
            ..self
        }
    }

    /// Adds a node. Registering the same id twice is a compile-time error.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            self.duplicate_ids.push(id);
        } else {
            self.nodes.insert(id, node);
        }
        self
    }

    /// Adds an edge from `from_id` to `to_id`.
    ///
    /// Use `START` for graph entry and `END` for graph exit. Both ids (except
    /// START/END) must be registered via `add_node` before `compile()`.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after the source node's update is
    /// merged, `path(state)` returns a label and `path_map[label]` names the
    /// next node (or `END`).
    ///
    /// The source node must not also have an unconditional outgoing edge, and
    /// every path-map value must be a registered node id or `END`.
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: HashMap<String, String>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Builds the executable graph.
    ///
    /// Rejects, at build time and never at run time: duplicate node ids, edges
    /// naming unregistered nodes, repeated edges, zero or multiple edges from
    /// START, cycles,
    /// an END that is missing or unreachable from the start node, and nodes
    /// carrying both edge kinds. On success the plan is immutable and can be
    /// invoked repeatedly.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        if let Some(dup) = self.duplicate_ids.first() {
            return Err(CompilationError::DuplicateNode(dup.clone()));
        }
        let mut seen_edges = HashSet::new();
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
            // The run loop decrements one fan-in count per declared edge; a
            // repeated edge would decrement past what compile accounted for.
            if !seen_edges.insert((from.as_str(), to.as_str())) {
                return Err(CompilationError::DuplicateEdge {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            for target in router.targets() {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                }
            }
        }

        let start_edges: Vec<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        let first = match start_edges.len() {
            1 => start_edges.into_iter().next().unwrap(),
            _ => return Err(CompilationError::MissingStart),
        };

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self
                .conditional_edges
                .values()
                .any(|r| r.targets().any(|t| t == END));
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        for source in self.conditional_edges.keys() {
            if self.edges.iter().any(|(f, _)| f == source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        // Successors per node: declared edges, plus every possible conditional
        // destination (each router resolves to exactly one of them per run).
        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in self.edges.iter().filter(|(f, _)| f != START) {
            successors.entry(from.clone()).or_default().push(to.clone());
        }
        let mut all_successors = successors.clone();
        for (source, router) in &self.conditional_edges {
            let targets: HashSet<&String> = router.targets().collect();
            all_successors
                .entry(source.clone())
                .or_default()
                .extend(targets.into_iter().cloned());
        }

        // Fan-in counts: one completion expected per incoming edge. A
        // conditional edge contributes at most one completion to any node it
        // may resolve to; unchosen targets simply never become ready.
        let mut indegree: HashMap<String, usize> =
            self.nodes.keys().map(|id| (id.clone(), 0)).collect();
        for targets in all_successors.values() {
            let distinct: HashSet<&String> = targets.iter().collect();
            for target in distinct {
                if target != END {
                    *indegree
                        .get_mut(target)
                        .expect("validated edge target exists") += 1;
                }
            }
        }

        Self::check_acyclic(&self.nodes, &all_successors)?;
        Self::check_end_reachable(&first, &all_successors)?;

        let state_updater = self
            .state_updater
            .unwrap_or_else(|| Arc::new(ReplaceUpdater));

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            successors,
            conditional: self.conditional_edges,
            indegree,
            state_updater,
        })
    }

    /// Kahn's algorithm over all possible edges; leftover nodes mean a cycle.
    fn check_acyclic(
        nodes: &HashMap<String, Arc<dyn Node<S>>>,
        all_successors: &HashMap<String, Vec<String>>,
    ) -> Result<(), CompilationError> {
        let mut degree: HashMap<&String, usize> = nodes.keys().map(|id| (id, 0)).collect();
        for targets in all_successors.values() {
            for t in targets.iter().filter(|t| *t != END) {
                if let Some(d) = degree.get_mut(t) {
                    *d += 1;
                }
            }
        }
        let mut queue: VecDeque<&String> = degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut seen = 0usize;
        while let Some(id) = queue.pop_front() {
            seen += 1;
            if let Some(targets) = all_successors.get(id) {
                for t in targets.iter().filter(|t| *t != END) {
                    let d = degree.get_mut(t).expect("validated edge target exists");
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(t);
                    }
                }
            }
        }
        if seen == nodes.len() {
            Ok(())
        } else {
            Err(CompilationError::CycleDetected)
        }
    }

    /// BFS from the start node over all possible edges; END must be reachable.
    fn check_end_reachable(
        first: &str,
        all_successors: &HashMap<String, Vec<String>>,
    ) -> Result<(), CompilationError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([first]);
        while let Some(id) = queue.pop_front() {
            if id == END {
                return Ok(());
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(targets) = all_successors.get(id) {
                queue.extend(targets.iter().map(String::as_str));
            }
        }
        Err(CompilationError::UnreachableEnd)
    }
}
