//! BigQuery warehouse client.
//!
//! Existence checks run as a parameterized query; persist decomposes the
//! flattened record into the normalized tables (`research_papers`, `authors`,
//! `authors_x_research_papers`, `keywords`, `keywords_x_research_papers`,
//! `key_research_findings`) and streams each with `insertAll`. Any reported
//! row error raises — a partial write is never acknowledged as success.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::TaskError;
use crate::hash::hash_text;
use crate::tasks::Warehouse;

/// Warehouse backed by the BigQuery REST API.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    base_url: String,
    project: String,
    dataset: String,
    access_token: String,
}

impl BigQueryWarehouse {
    /// Builds a client for `project.dataset` with the given token and timeout.
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TaskError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskError::Query(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: "https://bigquery.googleapis.com".to_string(),
            project: project.into(),
            dataset: dataset.into(),
            access_token: access_token.into(),
        })
    }

    /// Overrides the API base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn insert_all(&self, table: &str, rows: Vec<Value>) -> Result<(), TaskError> {
        if rows.is_empty() {
            return Ok(());
        }
        tracing::info!(table, rows = rows.len(), "Inserting rows into BigQuery table");
        let url = format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, self.project, self.dataset, table
        );
        let body = json!({
            "kind": "bigquery#tableDataInsertAllRequest",
            "rows": rows.into_iter().map(|r| json!({ "json": r })).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::Insert(format!("insert into '{table}' failed: {e}")))?;
        if !response.status().is_success() {
            return Err(TaskError::Insert(format!(
                "insert into '{table}' failed: HTTP {}",
                response.status()
            )));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| TaskError::Insert(format!("insert into '{table}': bad reply: {e}")))?;
        if let Some(errors) = reply.get("insertErrors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(TaskError::Insert(format!(
                    "insert into '{table}' reported row errors: {}",
                    Value::Array(errors.clone())
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn paper_exists(&self, paper_id: &str) -> Result<bool, TaskError> {
        tracing::info!(paper_id, "Checking if research paper has already been processed");
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.base_url, self.project
        );
        let query = format!(
            "SELECT id FROM `{}.{}.research_papers` WHERE id = @paper_id",
            self.project, self.dataset
        );
        let body = json!({
            "query": query,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "paper_id",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": paper_id },
            }],
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::Query(format!("failed to query research paper data: {e}")))?;
        if !response.status().is_success() {
            return Err(TaskError::Query(format!(
                "failed to query research paper data: HTTP {}",
                response.status()
            )));
        }
        let reply: Value = response
            .json()
            .await
            .map_err(|e| TaskError::Query(format!("bad query reply: {e}")))?;
        let processed = reply
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false);
        tracing::info!(paper_id, processed, "Existence check complete");
        Ok(processed)
    }

    async fn persist(&self, paper_id: &str, record: &Map<String, Value>) -> Result<(), TaskError> {
        tracing::info!(paper_id, "Inserting data into BigQuery tables");
        self.insert_all("research_papers", vec![build_paper_row(paper_id, record)])
            .await?;

        let authors = build_author_rows(paper_id, record)?;
        self.insert_all("authors", authors.clone()).await?;
        self.insert_all("authors_x_research_papers", authors).await?;

        let keywords = build_keyword_rows(paper_id, record)?;
        self.insert_all("keywords", keywords.clone()).await?;
        self.insert_all("keywords_x_research_papers", keywords).await?;

        self.insert_all("key_research_findings", build_finding_rows(paper_id, record))
            .await?;
        tracing::info!(paper_id, "Data insertion complete");
        Ok(())
    }
}

fn field(record: &Map<String, Value>, key: &str) -> Value {
    record.get(key).cloned().unwrap_or(Value::Null)
}

/// Strings of a list-valued field. A null or absent list means no sub-records.
fn string_list<'a>(record: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Row for the `research_papers` table.
fn build_paper_row(paper_id: &str, record: &Map<String, Value>) -> Value {
    json!({
        "id": paper_id,
        "title": field(record, "title"),
        "abstract": field(record, "abstract"),
        "summary": field(record, "summary"),
        "methodology": field(record, "methodology"),
        "publication_date": field(record, "publication_date"),
    })
}

/// Rows for `authors` / `authors_x_research_papers`; author ids hash the name.
fn build_author_rows(paper_id: &str, record: &Map<String, Value>) -> Result<Vec<Value>, TaskError> {
    string_list(record, "authors")
        .into_iter()
        .map(|author| {
            Ok(json!({
                "author_id": hash_text(author)?,
                "name": author,
                "paper_id": paper_id,
            }))
        })
        .collect()
}

/// Rows for `keywords` / `keywords_x_research_papers`.
fn build_keyword_rows(paper_id: &str, record: &Map<String, Value>) -> Result<Vec<Value>, TaskError> {
    string_list(record, "keywords")
        .into_iter()
        .map(|keyword| {
            Ok(json!({
                "keyword_id": hash_text(keyword)?,
                "keyword": keyword,
                "paper_id": paper_id,
            }))
        })
        .collect()
}

/// Rows for `key_research_findings`.
fn build_finding_rows(paper_id: &str, record: &Map<String, Value>) -> Vec<Value> {
    string_list(record, "key_research_findings")
        .into_iter()
        .map(|finding| json!({ "paper_id": paper_id, "finding": finding }))
        .collect()
}
