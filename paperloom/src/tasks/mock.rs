//! In-memory collaborator doubles for unit and integration tests.
//!
//! Public (not `#[cfg(test)]`) so downstream crates can wire a pipeline
//! without real Google credentials. Each mock records the calls it receives
//! so tests can assert on side effects.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::tasks::{LlmClient, ObjectStore, Warehouse};

/// Object store backed by an in-memory name to bytes map.
#[derive(Debug, Default)]
pub struct MockObjectStore {
    objects: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object keyed by name.
    pub fn with_object(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(name.into(), bytes.into());
        self
    }

    /// Names fetched so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn fetch_bytes(&self, name: &str) -> Result<Vec<u8>, TaskError> {
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.to_string());
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::Storage(format!("object '{}' not found", name)))
    }
}

/// Warehouse double with a scripted existence answer and recorded inserts.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    exists: bool,
    exists_error: Option<TaskError>,
    persist_error: Option<TaskError>,
    persisted: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockWarehouse {
    /// Warehouse that knows no papers and accepts every insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Warehouse that reports every paper as already processed.
    pub fn with_existing_paper(mut self) -> Self {
        self.exists = true;
        self
    }

    /// Fails the existence query with the given error.
    pub fn with_query_error(mut self, error: TaskError) -> Self {
        self.exists_error = Some(error);
        self
    }

    /// Fails every insert with the given error.
    pub fn with_persist_error(mut self, error: TaskError) -> Self {
        self.persist_error = Some(error);
        self
    }

    /// `(paper_id, record)` pairs persisted so far, in call order.
    pub fn persisted(&self) -> Vec<(String, Map<String, Value>)> {
        self.persisted.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn paper_exists(&self, _paper_id: &str) -> Result<bool, TaskError> {
        match &self.exists_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.exists),
        }
    }

    async fn persist(
        &self,
        paper_id: &str,
        record: &Map<String, Value>,
    ) -> Result<(), TaskError> {
        if let Some(e) = &self.persist_error {
            return Err(e.clone());
        }
        self.persisted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((paper_id.to_string(), record.clone()));
        Ok(())
    }
}

/// Model double that matches prompts against substring rules.
///
/// The most recently added rule whose needle appears in the prompt wins, so
/// a later rule overrides an earlier one for the same needle; without a
/// match the default reply applies. Rules make a single instance serve the
/// three concurrent enrichment prompts of a pipeline run.
#[derive(Debug)]
pub struct MockLlm {
    rules: Vec<(String, Result<String, TaskError>)>,
    default: Result<String, TaskError>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Replies with `reply` to every prompt.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every prompt with `error`.
    pub fn failing(error: TaskError) -> Self {
        Self {
            rules: Vec::new(),
            default: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `reply` to prompts containing `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Ok(reply.into())));
        self
    }

    /// Fails prompts containing `needle` with `error`.
    pub fn with_failing_rule(mut self, needle: impl Into<String>, error: TaskError) -> Self {
        self.rules.push((needle.into(), Err(error)));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String, TaskError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        for (needle, reply) in self.rules.iter().rev() {
            if prompt.contains(needle.as_str()) {
                return reply.clone();
            }
        }
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: an unknown object name fails as a storage error and the
    /// attempt is still recorded.
    #[tokio::test]
    async fn missing_object_is_a_storage_error() {
        let store = MockObjectStore::new().with_object("a.pdf", b"bytes".to_vec());
        assert!(store.fetch_bytes("a.pdf").await.is_ok());
        let err = store.fetch_bytes("b.pdf").await.unwrap_err();
        assert!(matches!(err, TaskError::Storage(_)));
        assert_eq!(store.fetched(), vec!["a.pdf", "b.pdf"]);
    }

    /// **Scenario**: persisted records are observable per paper id.
    #[tokio::test]
    async fn warehouse_records_persist_calls() {
        let warehouse = MockWarehouse::new();
        assert!(!warehouse.paper_exists("abc").await.unwrap());
        warehouse.persist("abc", &Map::new()).await.unwrap();
        let calls = warehouse.persisted();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abc");
    }

    /// **Scenario**: substring rules route distinct prompts to distinct
    /// replies, falling back to the default.
    #[tokio::test]
    async fn llm_rules_match_by_substring() {
        let llm = MockLlm::replying("{}")
            .with_rule("Extract the following metadata", "{\"title\": \"T\"}")
            .with_failing_rule("Key Research Findings", TaskError::Llm("down".into()));
        assert_eq!(
            llm.generate("Extract the following metadata ...").await.unwrap(),
            "{\"title\": \"T\"}"
        );
        assert!(llm.generate("... Key Research Findings ...").await.is_err());
        assert_eq!(llm.generate("anything else").await.unwrap(), "{}");
        assert_eq!(llm.prompts().len(), 3);
    }

    /// **Scenario**: a later rule for the same needle overrides an earlier
    /// one, so a scripted success can be flipped to a failure per test.
    #[tokio::test]
    async fn later_rule_overrides_earlier_for_same_needle() {
        let llm = MockLlm::replying("{}")
            .with_rule("metadata", "{\"title\": \"T\"}")
            .with_failing_rule("metadata", TaskError::Llm("overloaded".into()));
        let err = llm.generate("... metadata ...").await.unwrap_err();
        assert!(matches!(err, TaskError::Llm(_)));

        let llm = MockLlm::failing(TaskError::Llm("down".into()))
            .with_failing_rule("summary", TaskError::Llm("down".into()))
            .with_rule("summary", "{\"summary\": \"S\"}");
        assert_eq!(
            llm.generate("... summary ...").await.unwrap(),
            "{\"summary\": \"S\"}"
        );
    }
}
