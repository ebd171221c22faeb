//! Collaborator contracts for the ingestion pipeline.
//!
//! The workflow core only depends on these traits; production clients
//! ([`GcsObjectStore`], [`BigQueryWarehouse`], [`VertexLlm`]) talk to the
//! Google APIs over HTTP, and scripted mocks ([`MockObjectStore`],
//! [`MockWarehouse`], [`MockLlm`]) drive the tests. Each collaborator is a
//! stateless per-call service: no connection pooling or transaction
//! coordination is assumed by the core.

mod bigquery;
mod extract;
mod gcs;
mod mock;
mod vertex;

pub use bigquery::BigQueryWarehouse;
pub use extract::{
    extract_metadata, extract_research, extract_summary, prompted_extract, METADATA_FIELDS,
    RESEARCH_FIELDS, SUMMARY_FIELDS,
};
pub use gcs::GcsObjectStore;
pub use mock::{MockLlm, MockObjectStore, MockWarehouse};
pub use vertex::VertexLlm;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::error::TaskError;

/// Object storage: raw bytes by object name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads the named object. Fails with [`TaskError::Storage`].
    async fn fetch_bytes(&self, name: &str) -> Result<Vec<u8>, TaskError>;
}

/// Relational warehouse: existence checks and normalized inserts.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// True when a paper with this id was already persisted.
    /// Fails with [`TaskError::Query`].
    async fn paper_exists(&self, paper_id: &str) -> Result<bool, TaskError>;

    /// Decomposes the flattened record into normalized sub-records (paper,
    /// authors, keywords, findings) and inserts each. A sub-record insert
    /// failure raises [`TaskError::Insert`]; partial writes are never
    /// acknowledged as success.
    async fn persist(&self, paper_id: &str, record: &Map<String, Value>) -> Result<(), TaskError>;
}

/// Hosted language model: prompt in, raw completion text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt and returns the model's text. Fails with
    /// [`TaskError::Llm`]; prompted-extraction callers swallow this into an
    /// all-null record.
    async fn generate(&self, prompt: &str) -> Result<String, TaskError>;
}
