//! Result types produced by the analysis pipeline.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Outcome of the summary job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Cleaned summary markdown; empty when `error` is set.
    pub text: String,
    pub duration_ms: u64,
    pub error: Option<AnalysisError>,
}

/// Outcome of one image analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    /// 0-based position of the image in the document.
    pub index: usize,
    /// Cleaned description markdown; empty when `error` is set.
    pub description: String,
    pub duration_ms: u64,
    pub error: Option<AnalysisError>,
}

impl SummaryResult {
    pub fn from_outcome(outcome: Result<String, AnalysisError>, duration_ms: u64) -> Self {
        match outcome {
            Ok(text) => Self {
                text,
                duration_ms,
                error: None,
            },
            Err(e) => Self {
                text: String::new(),
                duration_ms,
                error: Some(e),
            },
        }
    }

    pub fn to_outcome(&self) -> Result<String, String> {
        match &self.error {
            None => Ok(self.text.clone()),
            Some(e) => Err(e.to_string()),
        }
    }
}

impl ImageResult {
    pub fn from_outcome(index: usize, outcome: Result<String, AnalysisError>, duration_ms: u64) -> Self {
        match outcome {
            Ok(description) => Self {
                index,
                description,
                duration_ms,
                error: None,
            },
            Err(e) => Self {
                index,
                description: String::new(),
                duration_ms,
                error: Some(e),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Description on success, user-visible error text otherwise.
    pub fn to_outcome(&self) -> Result<String, String> {
        match &self.error {
            None => Ok(self.description.clone()),
            Some(e) => Err(e.to_string()),
        }
    }
}

/// Aggregate counters for one "analyze all" run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_images: usize,
    pub succeeded_images: usize,
    pub failed_images: usize,
    pub summary_ok: bool,
    pub total_duration_ms: u64,
}

/// Everything one "analyze all" run produced.
///
/// `images[i]` always belongs to the document's `images[i]`, whatever order
/// the jobs finished in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: SummaryResult,
    pub images: Vec<ImageResult>,
    pub stats: BatchStats,
}
