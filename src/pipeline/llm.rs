//! Summarizer and vision clients.
//!
//! Thin request builders over [`GenerativeModel`]: all wording lives in
//! [`crate::prompts`], all transport in [`crate::model`]. Failures come back
//! as [`AnalysisError`] values and are never retried; the caller decides how
//! to show them.
//!
//! ## Request layouts
//!
//! Summary: `[instruction, full text]`.
//!
//! Image: `[role, context?, separator?, instruction, image, question 1,
//! question 2]`, where the context block is present unless
//! [`crate::config::VisionContext::None`] is configured or the document has
//! no text.

use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::model::{GenerativeModel, ModelRequest, TextStream};
use crate::pipeline::{encode, postprocess};
use crate::prompts;
use tracing::{debug, warn};

/// Job label of the summary request.
pub const SUMMARY_JOB: &str = "summary";

/// Job label of the analysis of image `index` (0-based), as shown to users.
pub fn image_job(index: usize) -> String {
    format!("image #{}", index + 1)
}

/// Build the summary request for `text`.
pub fn summary_request(text: &str, config: &AppConfig) -> ModelRequest {
    ModelRequest::new(SUMMARY_JOB, config)
        .text(prompts::summary_prompt(&config.language))
        .text(text)
}

/// Summarise the full document text in one blocking call.
pub async fn summarize(
    model: &dyn GenerativeModel,
    text: &str,
    config: &AppConfig,
) -> Result<String, AnalysisError> {
    let request = summary_request(text, config);
    debug!("summary: {} chars of text → {}", text.len(), model.name());
    match model.generate(&request).await {
        Ok(reply) => Ok(postprocess::clean_reply(&reply)),
        Err(e) => {
            warn!("{e}");
            Err(e)
        }
    }
}

/// Summarise the full document text, receiving the reply incrementally.
///
/// Fragments are raw (uncleaned); concatenating them yields the reply.
pub async fn summarize_stream(
    model: &dyn GenerativeModel,
    text: &str,
    config: &AppConfig,
) -> Result<TextStream, AnalysisError> {
    let request = summary_request(text, config);
    debug!("summary (stream): {} chars of text → {}", text.len(), model.name());
    model.generate_stream(&request).await.map_err(|e| {
        warn!("{e}");
        e
    })
}

/// Build the request describing one image, or fail if the blob does not decode.
pub fn image_request(
    index: usize,
    image_bytes: &[u8],
    context: Option<&str>,
    config: &AppConfig,
) -> Result<ModelRequest, AnalysisError> {
    let job = image_job(index);
    let image = encode::prepare_image(&job, image_bytes)?;

    let mut request = ModelRequest::new(job, config).text(prompts::VISION_ROLE_PROMPT);
    if let Some(ctx) = context {
        request = request
            .text(prompts::vision_context(ctx))
            .text(prompts::VISION_CONTEXT_SEPARATOR);
    }
    request = request
        .text(prompts::vision_instruction(&config.language))
        .image(image);
    for question in prompts::VISION_QUESTIONS {
        request = request.text(question);
    }
    Ok(request)
}

/// Describe one image, optionally with surrounding document text.
pub async fn analyze_image(
    model: &dyn GenerativeModel,
    index: usize,
    image_bytes: &[u8],
    context: Option<&str>,
    config: &AppConfig,
) -> Result<String, AnalysisError> {
    let outcome = match image_request(index, image_bytes, context, config) {
        Ok(request) => model.generate(&request).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(reply) => Ok(postprocess::clean_reply(&reply)),
        Err(e) => {
            warn!("{e}");
            Err(e)
        }
    }
}
