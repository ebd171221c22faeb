//! The three concurrent enrichment nodes, one struct parameterized by kind.
//!
//! Each reads `text`, runs its prompted extraction, and emits one namespaced
//! mapping. Model failures never abort the run: the extraction helpers
//! degrade to a field-complete all-null record, so a flaky model call costs
//! one enrichment, not the whole ingestion.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::graph::Node;
use crate::pipeline::{keys, EXTRACT_METADATA, EXTRACT_RESEARCH, EXTRACT_SUMMARY};
use crate::state::PipelineState;
use crate::tasks::{extract_metadata, extract_research, extract_summary, LlmClient};

/// Which extraction an [`EnrichmentNode`] performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enrichment {
    /// Title, authors, publication date, abstract.
    Metadata,
    /// Methodology and key research findings.
    Research,
    /// Summary and keywords.
    Summary,
}

impl Enrichment {
    fn node_id(self) -> &'static str {
        match self {
            Enrichment::Metadata => EXTRACT_METADATA,
            Enrichment::Research => EXTRACT_RESEARCH,
            Enrichment::Summary => EXTRACT_SUMMARY,
        }
    }

    fn payload_key(self) -> &'static str {
        match self {
            Enrichment::Metadata => keys::METADATA,
            Enrichment::Research => keys::RESEARCH,
            Enrichment::Summary => keys::SUMMARY,
        }
    }
}

/// Prompted extraction over the paper text, emitted under this kind's key.
pub struct EnrichmentNode {
    llm: Arc<dyn LlmClient>,
    kind: Enrichment,
}

impl EnrichmentNode {
    pub fn new(llm: Arc<dyn LlmClient>, kind: Enrichment) -> Self {
        Self { llm, kind }
    }
}

#[async_trait]
impl Node<PipelineState> for EnrichmentNode {
    fn id(&self) -> &str {
        self.kind.node_id()
    }

    async fn run(&self, snapshot: PipelineState) -> Result<PipelineState, WorkflowError> {
        let text = snapshot.require_str(self.kind.node_id(), keys::TEXT)?;
        let record = match self.kind {
            Enrichment::Metadata => extract_metadata(self.llm.as_ref(), text).await,
            Enrichment::Research => extract_research(self.llm.as_ref(), text).await,
            Enrichment::Summary => extract_summary(self.llm.as_ref(), text).await,
        };
        Ok(PipelineState::update([(
            self.kind.payload_key(),
            Value::Object(record),
        )]))
    }
}
