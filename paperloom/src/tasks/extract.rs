//! Prompted structured extraction over paper text.
//!
//! Each enrichment asks the model for a JSON object matching a fixed field
//! set, strips any code fencing, parses, and normalizes to exactly those
//! fields. Degrade-gracefully policy: any failure — network, HTTP, malformed
//! output — yields a field-complete record with every value null. These
//! helpers never raise to the caller; a failed enrichment must not abort an
//! otherwise-valid ingestion.

use serde_json::{Map, Value};

use crate::tasks::LlmClient;

/// Schema fields for the metadata extraction.
pub const METADATA_FIELDS: &[&str] = &["title", "authors", "publication_date", "abstract"];

/// Schema fields for the findings/methodology extraction.
pub const RESEARCH_FIELDS: &[&str] = &["methodology", "key_research_findings"];

/// Schema fields for the summary/keywords extraction.
pub const SUMMARY_FIELDS: &[&str] = &["summary", "keywords"];

/// Runs one prompted extraction and normalizes the reply to `fields`.
///
/// Returns the all-null record on any failure; never errors.
pub async fn prompted_extract(
    llm: &dyn LlmClient,
    prompt: &str,
    fields: &[&str],
) -> Map<String, Value> {
    let raw = match llm.generate(prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "Prompted extraction failed; degrading to null record");
            return null_record(fields);
        }
    };
    match serde_json::from_str::<Value>(strip_code_fences(&raw)) {
        Ok(Value::Object(obj)) => normalize(obj, fields),
        Ok(other) => {
            tracing::error!(kind = ?other, "Model output was valid JSON but not an object");
            null_record(fields)
        }
        Err(e) => {
            tracing::error!(error = %e, "Model output was not valid JSON");
            null_record(fields)
        }
    }
}

/// Extract title, authors, publication date, and abstract.
pub async fn extract_metadata(llm: &dyn LlmClient, text: &str) -> Map<String, Value> {
    tracing::info!("Extracting metadata");
    prompted_extract(llm, &metadata_prompt(text), METADATA_FIELDS).await
}

/// Extract key research findings and methodology.
pub async fn extract_research(llm: &dyn LlmClient, text: &str) -> Map<String, Value> {
    tracing::info!("Extracting key research findings and methodology");
    prompted_extract(llm, &research_prompt(text), RESEARCH_FIELDS).await
}

/// Extract a concise summary and keywords.
pub async fn extract_summary(llm: &dyn LlmClient, text: &str) -> Map<String, Value> {
    tracing::info!("Extracting summary and keywords");
    prompted_extract(llm, &summary_prompt(text), SUMMARY_FIELDS).await
}

/// Field-complete record with every value null.
fn null_record(fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.to_string(), Value::Null))
        .collect()
}

/// Keeps exactly the schema fields; absent ones become null, extras are dropped.
fn normalize(mut obj: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.to_string(), obj.remove(*f).unwrap_or(Value::Null)))
        .collect()
}

/// Drops a leading/trailing markdown code fence the model may wrap its JSON in.
fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

fn metadata_prompt(text: &str) -> String {
    format!(
        r#"You are an AI assistant. Extract the following metadata from the research paper text:

- Title
- Authors
- Publication Date
- Abstract

Provide the output in **valid JSON format** that strictly follows this JSON schema:

{{
    "title": "string",                // The title of the paper.
    "authors": ["string"],            // An array of author names.
    "publication_date": "string",     // The publication date in "YYYY-MM-DD" format.
    "abstract": "string"              // The abstract of the paper.
}}

- All fields are required: if any information is missing, set its value to null.
- Authors: should be an array of author names as strings.
- Publication Date: must be in "YYYY-MM-DD" format. It can be found at the beginning or end of the text in most cases.
- Abstract: must be included exactly as it appears in the text, without any changes or modifications.
- Do not include any additional text: output only the JSON object.

Do not infer any data based on previous training, strictly use only source text given below:

Text:
"""
{text}
"""
"#
    )
}

fn research_prompt(text: &str) -> String {
    format!(
        r#"You are an AI assistant. From the research paper text provided, extract the following:

- Methodology
- Key Research Findings

Provide the output in **valid JSON format** that strictly follows this JSON schema:

{{
    "methodology": "string",            // The methodology used in the research.
    "key_research_findings": ["string"] // The key findings of the research.
}}

- Both fields are required: if any information is missing, set its value to null.
- Extract the content exactly as it appears in the text, without any changes or modifications.
- Do **not** include any additional text: output **only the JSON object**.

Do not infer any data based on previous training, strictly use only source text given below:

Text:
"""
{text}
"""
"#
    )
}

fn summary_prompt(text: &str) -> String {
    format!(
        r#"You are an AI assistant. From the research paper text provided, perform the following tasks:

1. **Generate a concise summary**: Provide a brief summary of the paper in your own words.

2. **Extract Keywords**: List the most relevant keywords or phrases that represent the main topics of the paper.

Provide the output in **valid JSON format** that strictly follows this JSON schema:

{{
    "summary": "string",      // A concise summary of the paper.
    "keywords": ["string"]    // An array of keywords or key phrases.
}}

- Both fields are required: if any information is missing, set its value to null.
- Keywords: should be an array of strings, each representing a keyword or key phrase.
- Do **not** include any additional text: output **only the JSON object**.

Do not infer any data based on previous training, strictly use only source text given below:

Text:
"""
{text}
"""
"#
    )
}
