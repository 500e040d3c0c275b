//! "Analyze all": one summary job plus one job per image.
//!
//! Two dispatch modes, selected by [`AppConfig::dispatch_mode`]:
//!
//! * [`DispatchMode::Sequential`]: summary first, then each image in
//!   document order. The callback sees every completion as it happens.
//! * [`DispatchMode::Concurrent`]: all jobs are polled together with at most
//!   `concurrency` requests in flight. Completions arrive in any order and are
//!   reassembled by image index before returning.
//!
//! A failed job never stops its siblings; its slot carries the
//! [`AnalysisError`](crate::error::AnalysisError) instead.

use crate::config::{AppConfig, DispatchMode};
use crate::model::GenerativeModel;
use crate::output::{BatchReport, BatchStats, ImageResult, SummaryResult};
use crate::pipeline::llm;
use crate::progress::AnalysisProgressCallback;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::info;

enum Job {
    Summary,
    Image(usize),
}

enum Finished {
    Summary(SummaryResult),
    Image(ImageResult),
}

/// Run the summary and every image analysis for one document.
///
/// Always returns a full report: `report.images.len() == images.len()` and
/// `report.images[i].index == i`.
pub async fn analyze_document(
    model: &dyn GenerativeModel,
    text: &str,
    images: &[Vec<u8>],
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> BatchReport {
    let start = Instant::now();
    let total_images = images.len();
    info!(
        "Analyzing document: summary + {} images ({:?}, model {})",
        total_images,
        config.dispatch_mode,
        model.name()
    );
    callback.on_analysis_start(total_images);

    let (summary, images) = match config.dispatch_mode {
        DispatchMode::Sequential => run_sequential(model, text, images, config, callback).await,
        DispatchMode::Concurrent => run_concurrent(model, text, images, config, callback).await,
    };

    let succeeded = images.iter().filter(|r| r.is_ok()).count();
    let stats = BatchStats {
        total_images,
        succeeded_images: succeeded,
        failed_images: total_images - succeeded,
        summary_ok: summary.error.is_none(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Analysis complete: summary {}, {}/{} images, {}ms",
        if stats.summary_ok { "ok" } else { "failed" },
        stats.succeeded_images,
        stats.total_images,
        stats.total_duration_ms
    );
    callback.on_analysis_complete(&stats);

    BatchReport {
        summary,
        images,
        stats,
    }
}

/// Run only the image analyses, dispatched the same way as [`analyze_document`].
///
/// Used when the summary is produced separately (e.g. streamed).
pub async fn analyze_images(
    model: &dyn GenerativeModel,
    text: &str,
    images: &[Vec<u8>],
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> Vec<ImageResult> {
    match config.dispatch_mode {
        DispatchMode::Sequential => {
            let mut results = Vec::with_capacity(images.len());
            for index in 0..images.len() {
                results.push(image_job(index, model, text, images, config, callback).await);
            }
            results
        }
        DispatchMode::Concurrent => {
            let mut results: Vec<ImageResult> = stream::iter(
                (0..images.len()).map(|index| image_job(index, model, text, images, config, callback)),
            )
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;
            results.sort_by_key(|r| r.index);
            results
        }
    }
}

async fn summary_job(
    model: &dyn GenerativeModel,
    text: &str,
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> SummaryResult {
    let start = Instant::now();
    callback.on_summary_start();
    let outcome = llm::summarize(model, text, config).await;
    let result = SummaryResult::from_outcome(outcome, start.elapsed().as_millis() as u64);
    callback.on_summary_complete(&result);
    result
}

async fn image_job(
    index: usize,
    model: &dyn GenerativeModel,
    text: &str,
    images: &[Vec<u8>],
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> ImageResult {
    let total_images = images.len();
    let start = Instant::now();
    callback.on_image_start(index, total_images);
    let context = config.vision_context.apply(text);
    let outcome = llm::analyze_image(model, index, &images[index], context, config).await;
    let result = ImageResult::from_outcome(index, outcome, start.elapsed().as_millis() as u64);
    callback.on_image_complete(&result, total_images);
    result
}

async fn run_sequential(
    model: &dyn GenerativeModel,
    text: &str,
    images: &[Vec<u8>],
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> (SummaryResult, Vec<ImageResult>) {
    let summary = summary_job(model, text, config, callback).await;
    let results = analyze_images(model, text, images, config, callback).await;
    (summary, results)
}

async fn run_concurrent(
    model: &dyn GenerativeModel,
    text: &str,
    images: &[Vec<u8>],
    config: &AppConfig,
    callback: &dyn AnalysisProgressCallback,
) -> (SummaryResult, Vec<ImageResult>) {
    let jobs = std::iter::once(Job::Summary).chain((0..images.len()).map(Job::Image));

    let finished: Vec<Finished> = stream::iter(jobs.map(|job| async move {
        match job {
            Job::Summary => Finished::Summary(summary_job(model, text, config, callback).await),
            Job::Image(index) => {
                Finished::Image(image_job(index, model, text, images, config, callback).await)
            }
        }
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    let mut summary = None;
    let mut slots: Vec<Option<ImageResult>> = vec![None; images.len()];
    for f in finished {
        match f {
            Finished::Summary(s) => summary = Some(s),
            Finished::Image(r) => {
                let index = r.index;
                slots[index] = Some(r);
            }
        }
    }

    // `jobs` always starts with the summary.
    let summary = summary.unwrap_or_else(|| SummaryResult::from_outcome(Ok(String::new()), 0));
    let results = slots.into_iter().flatten().collect();
    (summary, results)
}
