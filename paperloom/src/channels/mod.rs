//! State updaters: how a node's partial output is folded into shared state.
//!
//! The executor applies exactly one updater, one completion at a time, even
//! when node execution itself is concurrent. [`ReplaceUpdater`] swaps the
//! whole state (the engine default); [`MergeUpdater`] applies the payload
//! reducer from [`crate::state::merge`], which is what the ingestion pipeline
//! uses so that nodes can return partial, namespaced updates.

use std::fmt::Debug;
use std::sync::Arc;

use crate::state::{merge, PipelineState};

/// Controls how a node's returned state is merged into the current state.
///
/// Implementations must be pure with respect to `update`: the same
/// `(current, update)` pair always yields the same merged state, so the
/// executor may fold completions in any serial order.
pub trait StateUpdater<S>: Send + Sync + Debug
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Folds `update` into `current`. Called once per completed node.
    fn apply_update(&self, current: &mut S, update: &S);
}

/// Shared handle to a state updater, as stored in the compiled graph.
pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

/// Default updater: the node's output fully replaces the previous state.
#[derive(Debug, Clone, Default)]
pub struct ReplaceUpdater;

impl<S> StateUpdater<S> for ReplaceUpdater
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        *current = update.clone();
    }
}

/// Payload reducer updater: shallow last-writer-wins merge of the update's
/// payload keys into the current payload.
#[derive(Debug, Clone, Default)]
pub struct MergeUpdater;

impl StateUpdater<PipelineState> for MergeUpdater {
    fn apply_update(&self, current: &mut PipelineState, update: &PipelineState) {
        current.state = merge(&current.state, &update.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: ReplaceUpdater discards the previous state entirely.
    #[test]
    fn replace_updater_overwrites_state() {
        let mut current = 1i32;
        ReplaceUpdater.apply_update(&mut current, &7);
        assert_eq!(current, 7);
    }

    /// **Scenario**: MergeUpdater keeps earlier keys and folds in new ones.
    #[test]
    fn merge_updater_accumulates_payload_keys() {
        let mut current = PipelineState::update([("paper_id", json!("abc"))]);
        let update = PipelineState::update([("text", json!("body"))]);
        MergeUpdater.apply_update(&mut current, &update);
        assert_eq!(current.state["paper_id"], json!("abc"));
        assert_eq!(current.state["text"], json!("body"));
    }

    /// **Scenario**: an empty partial update leaves the state unchanged.
    #[test]
    fn merge_updater_empty_update_is_identity() {
        let mut current = PipelineState::update([("processed", json!(true))]);
        let before = current.clone();
        MergeUpdater.apply_update(&mut current, &PipelineState::new());
        assert_eq!(current, before);
    }
}
