//! Structured error types for the folio pipeline.
//!
//! User cancellation of an interactive prompt is deliberately NOT an error —
//! it is normal control flow and surfaces as [`crate::export::ExportOutcome::Cancelled`].
//! Everything here is a real failure that propagates to the caller after the
//! restore step has run.

use thiserror::Error;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as a valid report description.
    #[error("failed to parse report: {source}{hint}")]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// An image could not be loaded or decoded.
    #[error("image error: {0}")]
    Image(String),

    /// Raster encoding (PNG/JPEG/BMP) failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Writing or reading the fixed-page document package failed.
    #[error("document package error: {0}")]
    Package(String),

    /// PDF serialization failed.
    #[error("pdf error: {0}")]
    Pdf(String),

    /// The print adapter reported a failure while spooling pages.
    #[error("print error: {0}")]
    Print(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "\n  Hint: check for trailing commas, missing quotes, or unescaped characters."
            }
            serde_json::error::Category::Data => {
                "\n  Hint: the JSON is valid but doesn't match the report schema. Check field names and types."
            }
            serde_json::error::Category::Eof => "\n  Hint: unexpected end of input — is the JSON truncated?",
            serde_json::error::Category::Io => "",
        };
        FolioError::Parse {
            source: e,
            hint: hint.to_string(),
        }
    }
}
