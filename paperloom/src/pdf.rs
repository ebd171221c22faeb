//! Plain-text extraction from PDF byte streams.
//!
//! External collaborator boundary: bytes in, text out. A malformed byte
//! stream is a `TaskError::Extraction`; a well-formed PDF with no extractable
//! text yields an empty string, which is a valid (non-error) outcome.

use crate::error::TaskError;

/// Extracts the concatenated page text of a PDF document.
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, TaskError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| TaskError::Extraction(format!("failed to extract text from PDF: {e}")))
}
