//! Error types for the summize library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SummizeError`] — **Fatal** for the operation that raised it: the
//!   credential is missing, the upload is not a PDF, no document is loaded.
//!   Returned as `Err(SummizeError)` from extraction and controller calls.
//!
//! * [`AnalysisError`] — **Non-fatal**: one summary or one image analysis
//!   failed (API error, undecodable image) but every sibling job is fine.
//!   Stored inside [`crate::output::ImageResult`] / [`crate::output::SummaryResult`]
//!   and rendered as an inline error string by the presentation layer.
//!
//! A skipped image during extraction is neither: it is logged and counted in
//! [`crate::pipeline::extract::Extraction::skipped_images`].

use thiserror::Error;

/// All fatal errors returned by the summize library.
#[derive(Debug, Error)]
pub enum SummizeError {
    // ── Startup ───────────────────────────────────────────────────────────
    /// The generative-AI credential is missing or the provider cannot be built.
    #[error("Model backend '{backend}' is not configured.\n{hint}")]
    Configuration { backend: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Document ──────────────────────────────────────────────────────────
    /// The uploaded bytes are not a parseable PDF.
    #[error("File is not a valid PDF: {detail}")]
    MalformedDocument { detail: String },

    /// The upload was not declared as a PDF.
    #[error("Unsupported media type '{content_type}': only application/pdf is accepted")]
    UnsupportedMediaType { content_type: String },

    /// An action needs a current document but none was uploaded.
    #[error("No document has been uploaded yet")]
    NoDocument,

    /// The current document could not be extracted, so it cannot be analysed.
    #[error("Document '{name}' could not be read: {detail}")]
    DocumentUnavailable { name: String, detail: String },

    /// The requested image index does not exist in the current document.
    #[error("Image {index} is out of range (document has {total} images)")]
    ImageOutOfRange { index: usize, total: usize },

    /// A request referenced a file that is no longer current.
    #[error("File '{file_id}' is no longer the current document")]
    StaleFile { file_id: String },

    /// A newer request for the same result replaced this one.
    #[error("{job}: superseded by a newer request")]
    Superseded { job: String },

    // ── I/O ───────────────────────────────────────────────────────────────
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single summary or image job.
///
/// The overall batch always completes; each slot carries either its text or
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AnalysisError {
    /// The generative-AI call failed (transport, HTTP status, API error body).
    #[error("{job}: model request failed: {detail}")]
    RemoteService { job: String, detail: String },

    /// The image blob could not be decoded before sending.
    #[error("{job}: image could not be decoded: {detail}")]
    ImageDecode { job: String, detail: String },

    /// The model answered without any text.
    #[error("{job}: model returned an empty response")]
    EmptyResponse { job: String },
}

impl AnalysisError {
    pub(crate) fn remote(job: impl Into<String>, detail: impl ToString) -> Self {
        Self::RemoteService {
            job: job.into(),
            detail: detail.to_string(),
        }
    }
}
