//! Workflow graph engine: builder, compiled plan, routing.
//!
//! `StateGraph` declares nodes and edges and compiles them into a
//! `CompiledStateGraph`, which runs the plan with fan-out/fan-in concurrency
//! and serialized state merging. See [`Node`] for the unit-of-work contract
//! and [`ConditionalRouter`] for state-based routing.

mod compile_error;
mod compiled;
mod conditional;
mod logging;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn};
pub use node::Node;
pub use state_graph::{StateGraph, END, START};
