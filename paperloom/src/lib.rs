//! paperloom: a state-propagating ingestion workflow for research papers.
//!
//! A small graph engine (shared-state blackboard, async nodes, conditional
//! routing, fan-out/fan-in concurrency) plus the fixed pipeline built on it:
//! download a PDF from object storage, fingerprint and dedup it against the
//! warehouse, extract its text, run three concurrent model enrichments, and
//! persist the merged record.
//!
//! Entry points: [`pipeline::PipelineBuilder`] assembles the graph over the
//! [`tasks`] collaborator traits; `CompiledStateGraph::invoke` runs it.

pub mod channels;
pub mod error;
pub mod graph;
pub mod hash;
pub mod pdf;
pub mod pipeline;
pub mod state;
pub mod tasks;

pub use error::{TaskError, WorkflowError};
pub use graph::{CompilationError, CompiledStateGraph, Node, StateGraph, END, START};
pub use state::{merge, Payload, PipelineState};
