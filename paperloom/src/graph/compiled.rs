//! Compiled workflow graph: immutable, supports invoke only.
//!
//! Built by `StateGraph::compile`. Holds the nodes, the per-node successor
//! lists, the conditional routers, and the fan-in counts pre-computed at
//! compile time. `invoke` walks the plan: ready nodes (all incoming edges
//! completed) run concurrently, completions are folded into shared state one
//! at a time through the configured state updater, and the run ends when no
//! work remains. A node failure aborts the run immediately.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::channels::BoxedStateUpdater;
use crate::error::WorkflowError;
use crate::graph::conditional::ConditionalRouter;
use crate::graph::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state, log_state_update,
};
use crate::graph::state_graph::END;
use crate::graph::Node;

/// Compiled graph: immutable structure, supports invoke only.
///
/// Created by `StateGraph::compile()`. Safe to clone and share; each `invoke`
/// tracks its own readiness state, so one plan serves many runs.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Node the single START edge points to.
    pub(super) first_node_id: String,
    /// Unconditional successors per node (may include END).
    pub(super) successors: HashMap<String, Vec<String>>,
    /// Conditional routers per source node; resolved against merged state.
    pub(super) conditional: HashMap<String, ConditionalRouter<S>>,
    /// Incoming-edge counts per node, computed at compile time. Cloned per run.
    pub(super) indegree: HashMap<String, usize>,
    /// Folds each completed node's partial output into shared state.
    pub(super) state_updater: BoxedStateUpdater<S>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the workflow from the start node to completion.
    ///
    /// Scheduling: a node becomes ready once every predecessor edge pointing
    /// to it has completed (conditional edges count when they resolve to it);
    /// all ready nodes run concurrently, each against a snapshot of the state
    /// at spawn time. The updater is applied serially as completions arrive,
    /// so merge order cannot lose updates; with the disjoint-key invariant the
    /// final state is independent of completion order.
    ///
    /// On a node failure the envelope is re-raised immediately: the result is
    /// discarded, no further nodes are scheduled, and in-flight siblings are
    /// dropped with the task set.
    pub async fn invoke(&self, state: S) -> Result<S, WorkflowError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(WorkflowError::ExecutionFailed("empty graph".into()));
        }
        log_graph_start();

        let mut state = state;
        let mut indegree = self.indegree.clone();
        let mut running: JoinSet<(String, Result<S, WorkflowError>)> = JoinSet::new();
        self.spawn_node(&self.first_node_id, &state, &mut running);

        while let Some(joined) = running.join_next().await {
            let (node_id, result) = joined
                .map_err(|e| WorkflowError::ExecutionFailed(format!("node task failed: {e}")))?;
            let update = match result {
                Ok(update) => update,
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };
            log_node_complete(&node_id);

            // Reducer application is serialized here even though node
            // execution is concurrent; one merge at a time, no lost updates.
            self.state_updater.apply_update(&mut state, &update);
            log_state_update(&node_id);

            let targets: Vec<String> = match self.conditional.get(&node_id) {
                Some(router) => {
                    let target = match router.resolve_next(&state) {
                        Ok(target) => target,
                        Err(e) => {
                            log_graph_error(&e);
                            return Err(e);
                        }
                    };
                    tracing::debug!(from = %node_id, to = %target, "conditional routing");
                    vec![target]
                }
                None => self.successors.get(&node_id).cloned().unwrap_or_default(),
            };

            for target in targets {
                if target == END {
                    continue;
                }
                let remaining = indegree
                    .get_mut(&target)
                    .expect("compiled graph has all nodes");
                *remaining -= 1;
                if *remaining == 0 {
                    self.spawn_node(&target, &state, &mut running);
                }
            }
        }

        log_graph_complete();
        Ok(state)
    }

    fn spawn_node(
        &self,
        id: &str,
        state: &S,
        running: &mut JoinSet<(String, Result<S, WorkflowError>)>,
    ) {
        let node = self
            .nodes
            .get(id)
            .expect("compiled graph has all nodes")
            .clone();
        let id = id.to_string();
        let snapshot = state.clone();
        log_node_start(&id);
        log_node_state(&id, state);
        running.spawn(async move { (id, node.run(snapshot).await) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Barrier;
    use tokio::time::timeout;

    use crate::channels::{MergeUpdater, ReplaceUpdater};
    use crate::error::{TaskError, WorkflowError};
    use crate::graph::{Node, StateGraph, END, START};
    use crate::state::PipelineState;

    #[derive(Clone)]
    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for AddNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, state: i32) -> Result<i32, WorkflowError> {
            Ok(state + self.delta)
        }
    }

    /// Node that writes one payload key and counts its invocations.
    struct WriteNode {
        id: &'static str,
        key: &'static str,
        value: Value,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Node<PipelineState> for WriteNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, _snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut update = PipelineState::new();
            update.state.insert(self.key.to_string(), self.value.clone());
            Ok(update)
        }
    }

    /// **Scenario**: an empty compiled graph reports ExecutionFailed("empty graph").
    #[tokio::test]
    async fn invoke_empty_graph_returns_execution_failed() {
        let graph = CompiledStateGraph::<i32> {
            nodes: HashMap::new(),
            first_node_id: String::new(),
            successors: HashMap::new(),
            conditional: HashMap::new(),
            indegree: HashMap::new(),
            state_updater: Arc::new(ReplaceUpdater),
        };
        match graph.invoke(0).await {
            Err(WorkflowError::ExecutionFailed(msg)) => assert!(msg.contains("empty graph")),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    /// **Scenario**: a linear chain runs predecessor-before-successor; with the
    /// replace updater the final state reflects both steps in order.
    #[tokio::test]
    async fn invoke_linear_chain_runs_in_order() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("first", Arc::new(AddNode { id: "first", delta: 1 }));
        graph.add_node("second", Arc::new(AddNode { id: "second", delta: 2 }));
        graph.add_edge(START, "first");
        graph.add_edge("first", "second");
        graph.add_edge("second", END);
        let compiled = graph.compile().expect("graph compiles");
        assert_eq!(compiled.invoke(0).await.unwrap(), 3);
    }

    fn diamond(calls: &Arc<AtomicUsize>) -> crate::graph::CompiledStateGraph<PipelineState> {
        let mut graph = StateGraph::<PipelineState>::new().with_state_updater(Arc::new(MergeUpdater));
        graph.add_node(
            "src",
            Arc::new(WriteNode {
                id: "src",
                key: "text",
                value: json!("body"),
                calls: calls.clone(),
            }),
        );
        graph.add_node(
            "left",
            Arc::new(WriteNode {
                id: "left",
                key: "metadata",
                value: json!({"title": "T"}),
                calls: calls.clone(),
            }),
        );
        graph.add_node(
            "right",
            Arc::new(WriteNode {
                id: "right",
                key: "research",
                value: json!({"methodology": "M"}),
                calls: calls.clone(),
            }),
        );
        graph.add_node(
            "join",
            Arc::new(JoinNode {
                calls: calls.clone(),
            }),
        );
        graph.add_edge(START, "src");
        graph.add_edge("src", "left");
        graph.add_edge("src", "right");
        graph.add_edge("left", "join");
        graph.add_edge("right", "join");
        graph.add_edge("join", END);
        graph.compile().expect("diamond compiles")
    }

    /// Fan-in node: requires both branch keys to be present in its snapshot.
    struct JoinNode {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Node<PipelineState> for JoinNode {
        fn id(&self) -> &str {
            "join"
        }
        async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            snapshot.require("join", "metadata")?;
            snapshot.require("join", "research")?;
            Ok(PipelineState::update([("joined", json!(true))]))
        }
    }

    /// **Scenario**: fan-out branches both run, fan-in waits for both, every
    /// node runs exactly once, and the merged payload holds all disjoint keys.
    #[tokio::test]
    async fn invoke_diamond_merges_disjoint_branch_outputs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let compiled = diamond(&calls);
        let out = compiled.invoke(PipelineState::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4, "each node exactly once");
        assert_eq!(out.state["text"], json!("body"));
        assert_eq!(out.state["metadata"], json!({"title": "T"}));
        assert_eq!(out.state["research"], json!({"methodology": "M"}));
        assert_eq!(out.state["joined"], json!(true));
    }

    /// **Scenario**: a compiled plan is reusable; a second run starts from
    /// fresh readiness counts and produces the same result.
    #[tokio::test]
    async fn invoke_same_plan_twice_produces_same_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let compiled = diamond(&calls);
        let first = compiled.invoke(PipelineState::new()).await.unwrap();
        let second = compiled.invoke(PipelineState::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    /// Node that blocks on a shared barrier before writing its key. The test
    /// deadlocks unless all siblings are scheduled concurrently.
    struct BarrierNode {
        id: &'static str,
        key: &'static str,
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl Node<PipelineState> for BarrierNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, _snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
            self.barrier.wait().await;
            Ok(PipelineState::update([(self.key, json!(self.id))]))
        }
    }

    /// **Scenario**: independent siblings run concurrently — three nodes that
    /// rendezvous on a barrier can only complete if none stalls the others.
    #[tokio::test]
    async fn invoke_runs_independent_siblings_concurrently() {
        let barrier = Arc::new(Barrier::new(3));
        let mut graph = StateGraph::<PipelineState>::new().with_state_updater(Arc::new(MergeUpdater));
        graph.add_node(
            "seed",
            Arc::new(WriteNode {
                id: "seed",
                key: "text",
                value: json!(""),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        );
        for (id, key) in [("m", "metadata"), ("r", "research"), ("s", "summary")] {
            graph.add_node(
                id,
                Arc::new(BarrierNode {
                    id,
                    key,
                    barrier: barrier.clone(),
                }),
            );
            graph.add_edge("seed", id);
            graph.add_edge(id, END);
        }
        graph.add_edge(START, "seed");
        let compiled = graph.compile().expect("graph compiles");

        let out = timeout(Duration::from_secs(5), compiled.invoke(PipelineState::new()))
            .await
            .expect("siblings must not serialize behind one another")
            .unwrap();
        for key in ["metadata", "research", "summary"] {
            assert!(out.state.contains_key(key), "missing {key}");
        }
    }

    struct FailingNode;

    #[async_trait]
    impl Node<PipelineState> for FailingNode {
        fn id(&self) -> &str {
            "failing"
        }
        async fn run(&self, _snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
            Err(WorkflowError::node(
                "failing",
                TaskError::Storage("object missing".into()),
            ))
        }
    }

    /// **Scenario**: a node failure aborts the run and re-raises the envelope
    /// naming the failing node; downstream nodes never run.
    #[tokio::test]
    async fn invoke_node_failure_aborts_run_with_envelope() {
        let downstream_calls = Arc::new(AtomicUsize::new(0));
        let mut graph = StateGraph::<PipelineState>::new().with_state_updater(Arc::new(MergeUpdater));
        graph.add_node("failing", Arc::new(FailingNode));
        graph.add_node(
            "after",
            Arc::new(WriteNode {
                id: "after",
                key: "never",
                value: json!(true),
                calls: downstream_calls.clone(),
            }),
        );
        graph.add_edge(START, "failing");
        graph.add_edge("failing", "after");
        graph.add_edge("after", END);
        let compiled = graph.compile().expect("graph compiles");

        match compiled.invoke(PipelineState::new()).await {
            Err(WorkflowError::NodeFailed { node, .. }) => assert_eq!(node, "failing"),
            other => panic!("expected NodeFailed, got {:?}", other),
        }
        assert_eq!(downstream_calls.load(Ordering::SeqCst), 0);
    }

    /// **Scenario**: conditional edges route by state; the unchosen branch
    /// never becomes ready.
    #[tokio::test]
    async fn invoke_conditional_routes_by_state_and_skips_other_branch() {
        let even_calls = Arc::new(AtomicUsize::new(0));
        let odd_calls = Arc::new(AtomicUsize::new(0));

        let build = |even: Arc<AtomicUsize>, odd: Arc<AtomicUsize>| {
            let mut graph = StateGraph::<i32>::new();
            graph.add_node("decide", Arc::new(AddNode { id: "decide", delta: 0 }));
            graph.add_node("even_node", Arc::new(CountingAdd { delta: 10, calls: even }));
            graph.add_node("odd_node", Arc::new(CountingAdd { delta: 100, calls: odd }));
            graph.add_edge(START, "decide");
            graph.add_edge("even_node", END);
            graph.add_edge("odd_node", END);
            graph.add_conditional_edges(
                "decide",
                Arc::new(|s: &i32| if s % 2 == 0 { "even".into() } else { "odd".into() }),
                [
                    ("even".to_string(), "even_node".to_string()),
                    ("odd".to_string(), "odd_node".to_string()),
                ]
                .into_iter()
                .collect(),
            );
            graph.compile().expect("graph compiles")
        };

        let compiled = build(even_calls.clone(), odd_calls.clone());
        assert_eq!(compiled.invoke(2).await.unwrap(), 12);
        assert_eq!(even_calls.load(Ordering::SeqCst), 1);
        assert_eq!(odd_calls.load(Ordering::SeqCst), 0);

        assert_eq!(compiled.invoke(1).await.unwrap(), 101);
        assert_eq!(odd_calls.load(Ordering::SeqCst), 1);
    }

    struct CountingAdd {
        delta: i32,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Node<i32> for CountingAdd {
        fn id(&self) -> &str {
            "counting_add"
        }
        async fn run(&self, state: i32) -> Result<i32, WorkflowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(state + self.delta)
        }
    }

    /// **Scenario**: a conditional edge may resolve straight to END, ending the
    /// run with the state merged so far.
    #[tokio::test]
    async fn invoke_conditional_to_end_short_circuits() {
        let skipped = Arc::new(AtomicUsize::new(0));
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("decide", Arc::new(AddNode { id: "decide", delta: 1 }));
        graph.add_node(
            "skipped",
            Arc::new(CountingAdd { delta: 100, calls: skipped.clone() }),
        );
        graph.add_edge(START, "decide");
        graph.add_edge("skipped", END);
        graph.add_conditional_edges(
            "decide",
            Arc::new(|_: &i32| "done".into()),
            [
                ("done".to_string(), END.to_string()),
                ("more".to_string(), "skipped".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        let compiled = graph.compile().expect("graph compiles");
        assert_eq!(compiled.invoke(0).await.unwrap(), 1);
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }
}
