//! Input ingestion boundary.
//!
//! The engine consumes plain text; this module is the seam where documents
//! become text. File parsing is keyed by extension, and any extraction that
//! yields less than `MIN_EXTRACTED_CHARS` characters is rejected as a failed
//! extraction rather than passed downstream.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub const MIN_EXTRACTED_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("extracted text too short: {length} chars (minimum {MIN_EXTRACTED_CHARS})")]
    TooShort { length: usize },

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// A successfully extracted document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub length: usize,
}

impl ExtractedDocument {
    /// Builds a document from raw text, enforcing the minimum-length rule.
    pub fn from_text(
        text: String,
        title: Option<String>,
        source_url: Option<String>,
    ) -> Result<Self, IngestError> {
        let length = text.trim().len();
        if length < MIN_EXTRACTED_CHARS {
            return Err(IngestError::TooShort { length });
        }
        Ok(Self {
            text,
            title,
            source_url,
            length,
        })
    }
}

/// Anything that can produce a document for the pipeline (an URL scraper, a
/// file upload, a clipboard paste). Implementations own their own transport.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn extract(&self) -> Result<ExtractedDocument, IngestError>;
}

/// Reads a file to text, keyed by extension. `txt` and `md` are read as-is;
/// `pdf` goes through the PDF text extractor.
pub fn read_text_file(path: &Path) -> Result<String, IngestError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" | "md" => std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?,
        "pdf" => pdf_extract::extract_text(path).map_err(|e| IngestError::Pdf(e.to_string()))?,
        other => return Err(IngestError::UnsupportedExtension(other.to_string())),
    };

    info!(path = %path.display(), chars = text.len(), "read input file");
    Ok(text)
}
