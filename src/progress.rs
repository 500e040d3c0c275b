//! Progress-callback trait for analysis events.
//!
//! Pass an [`AnalysisProgressCallback`] to
//! [`crate::analyze::analyze_document`] to receive events as the summary and
//! each image complete. The web controller uses it to publish sequential
//! results into the session one by one; the CLI drives a progress bar with it.
//!
//! # Example
//!
//! ```rust
//! use summize::{AnalysisProgressCallback, ImageResult};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, result: &ImageResult, total_images: usize) {
//!         let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("image #{} done ({done}/{total_images})", result.index + 1);
//!     }
//! }
//! ```

use crate::output::{BatchStats, ImageResult, SummaryResult};

/// Called by the dispatcher as jobs start and finish.
///
/// Implementations must be `Send + Sync`: in concurrent mode completions are
/// reported from whichever future finishes, in any order. All methods have
/// no-op defaults so callers override only what they need.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before any job starts.
    fn on_analysis_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before the summary request is sent.
    fn on_summary_start(&self) {}

    /// Called when the summary succeeded or failed.
    fn on_summary_complete(&self, result: &SummaryResult) {
        let _ = result;
    }

    /// Called just before an image request is sent.
    ///
    /// * `index` — 0-based image position
    fn on_image_start(&self, index: usize, total_images: usize) {
        let _ = (index, total_images);
    }

    /// Called when an image analysis succeeded or failed.
    fn on_image_complete(&self, result: &ImageResult, total_images: usize) {
        let _ = (result, total_images);
    }

    /// Called once after every job has been attempted.
    fn on_analysis_complete(&self, stats: &BatchStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}
