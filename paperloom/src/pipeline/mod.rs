//! The fixed paper-ingestion pipeline: topology, node ids, payload keys.
//!
//! START → get_file → check_processed →(conditional)→ load_pdf → fan-out to
//! the three enrichment nodes → merge_results → insert_warehouse → END. The
//! conditional edge short-circuits to END when the warehouse already holds
//! the paper. [`PipelineBuilder`] wires registered nodes over this topology
//! with the payload merge reducer and compiles once; the compiled plan is
//! reused across runs.

mod check_processed;
mod enrich;
mod get_file;
mod insert_warehouse;
mod load_pdf;
mod merge_results;

pub use check_processed::CheckProcessedNode;
pub use enrich::{Enrichment, EnrichmentNode};
pub use get_file::GetFileNode;
pub use insert_warehouse::InsertWarehouseNode;
pub use load_pdf::LoadPdfNode;
pub use merge_results::MergeResultsNode;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::channels::MergeUpdater;
use crate::graph::{CompilationError, CompiledStateGraph, StateGraph, END, START};
use crate::state::PipelineState;
use crate::tasks::{LlmClient, ObjectStore, Warehouse};

/// Node ids, unique within the pipeline graph.
pub const GET_FILE: &str = "get_file";
pub const CHECK_PROCESSED: &str = "check_processed";
pub const LOAD_PDF: &str = "load_pdf";
pub const EXTRACT_METADATA: &str = "extract_metadata";
pub const EXTRACT_RESEARCH: &str = "extract_research";
pub const EXTRACT_SUMMARY: &str = "extract_summary";
pub const MERGE_RESULTS: &str = "merge_results";
pub const INSERT_WAREHOUSE: &str = "insert_warehouse";

/// Payload keys written and read by the pipeline nodes.
pub mod keys {
    /// Object name to ingest; seeded into the initial state by the caller.
    pub const FILE_NAME: &str = "file_name";
    /// Base64-encoded PDF bytes, written by `get_file`.
    pub const FILE: &str = "file";
    /// Content hash of the raw bytes, written by `get_file`.
    pub const PAPER_ID: &str = "paper_id";
    /// Whether the warehouse already holds the paper, written by `check_processed`.
    pub const PROCESSED: &str = "processed";
    /// Plain text extracted from the PDF, written by `load_pdf`.
    pub const TEXT: &str = "text";
    /// Namespaced enrichment records.
    pub const METADATA: &str = "metadata";
    pub const RESEARCH: &str = "research";
    pub const SUMMARY: &str = "summary";
}

/// Routing label: paper already ingested, skip to END.
pub const SKIP_PAPER: &str = "skip";
/// Routing label: new paper, continue to text extraction.
pub const PROCESS_PAPER: &str = "process";

/// Routes after the dedup check: `skip` when the paper is already in the
/// warehouse, `process` otherwise.
///
/// A missing or non-boolean `processed` entry yields a label outside the path
/// map, which the executor reports as an execution failure. Pure over the
/// state snapshot.
pub fn route_after_dedup(state: &PipelineState) -> String {
    match state.state.get(keys::PROCESSED) {
        Some(Value::Bool(true)) => SKIP_PAPER.to_string(),
        Some(Value::Bool(false)) => PROCESS_PAPER.to_string(),
        _ => "unroutable".to_string(),
    }
}

/// Initial state for one run: just the object name to ingest.
pub fn initial_state(object_name: impl Into<String>) -> PipelineState {
    PipelineState::update([(keys::FILE_NAME, Value::String(object_name.into()))])
}

/// Assembles the ingestion graph over the three collaborators.
///
/// **Interaction**: the cli builds this once from configured clients; tests
/// build it from the public mocks.
pub struct PipelineBuilder {
    store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
    llm: Arc<dyn LlmClient>,
}

impl PipelineBuilder {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            store,
            warehouse,
            llm,
        }
    }

    /// Compiles the fixed topology into a reusable plan.
    pub fn build(self) -> Result<CompiledStateGraph<PipelineState>, CompilationError> {
        let mut graph = StateGraph::new().with_state_updater(Arc::new(MergeUpdater));

        graph.add_node(GET_FILE, Arc::new(GetFileNode::new(self.store)));
        graph.add_node(
            CHECK_PROCESSED,
            Arc::new(CheckProcessedNode::new(self.warehouse.clone())),
        );
        graph.add_node(LOAD_PDF, Arc::new(LoadPdfNode));
        graph.add_node(
            EXTRACT_METADATA,
            Arc::new(EnrichmentNode::new(self.llm.clone(), Enrichment::Metadata)),
        );
        graph.add_node(
            EXTRACT_RESEARCH,
            Arc::new(EnrichmentNode::new(self.llm.clone(), Enrichment::Research)),
        );
        graph.add_node(
            EXTRACT_SUMMARY,
            Arc::new(EnrichmentNode::new(self.llm, Enrichment::Summary)),
        );
        graph.add_node(MERGE_RESULTS, Arc::new(MergeResultsNode));
        graph.add_node(
            INSERT_WAREHOUSE,
            Arc::new(InsertWarehouseNode::new(self.warehouse)),
        );

        graph.add_edge(START, GET_FILE);
        graph.add_edge(GET_FILE, CHECK_PROCESSED);
        graph.add_conditional_edges(
            CHECK_PROCESSED,
            Arc::new(route_after_dedup),
            HashMap::from([
                (SKIP_PAPER.to_string(), END.to_string()),
                (PROCESS_PAPER.to_string(), LOAD_PDF.to_string()),
            ]),
        );
        graph.add_edge(LOAD_PDF, EXTRACT_METADATA);
        graph.add_edge(LOAD_PDF, EXTRACT_RESEARCH);
        graph.add_edge(LOAD_PDF, EXTRACT_SUMMARY);
        graph.add_edge(EXTRACT_METADATA, MERGE_RESULTS);
        graph.add_edge(EXTRACT_RESEARCH, MERGE_RESULTS);
        graph.add_edge(EXTRACT_SUMMARY, MERGE_RESULTS);
        graph.add_edge(MERGE_RESULTS, INSERT_WAREHOUSE);
        graph.add_edge(INSERT_WAREHOUSE, END);

        graph.compile()
    }
}
