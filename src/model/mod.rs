//! The generative-AI seam.
//!
//! Every model call goes through [`GenerativeModel`]: a multi-part request
//! (text and images, in order) goes in, opaque markdown comes out, either in
//! one piece ([`GenerativeModel::generate`]) or as a stream of fragments
//! ([`GenerativeModel::generate_stream`]).
//!
//! The shipped backend is [`provider::ProviderModel`]: Gemini through
//! `edgequake_llm::GeminiProvider`, or any provider built by
//! `edgequake_llm::ProviderFactory`. Tests substitute scripted
//! implementations of the trait.

pub mod provider;

use crate::config::AppConfig;
use crate::error::{AnalysisError, SummizeError};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

pub use provider::ProviderModel;

/// A boxed stream of reply fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AnalysisError>> + Send>>;

/// A base64-encoded image ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard base64, no data-URI prefix.
    pub data: String,
}

/// One element of a multi-part request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(EncodedImage),
}

/// A single request to the model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Human-readable job label used in logs and error messages ("summary", "image #3").
    pub job: String,
    pub parts: Vec<Part>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ModelRequest {
    pub fn new(job: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            job: job.into(),
            parts: Vec::new(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn image(mut self, image: EncodedImage) -> Self {
        self.parts.push(Part::Image(image));
        self
    }

    /// Iterate over the text parts in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Text(t) => Some(t.as_str()),
            Part::Image(_) => None,
        })
    }

    /// Iterate over the image parts in order.
    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.parts.iter().filter_map(|p| match p {
            Part::Image(img) => Some(img),
            Part::Text(_) => None,
        })
    }
}

/// A generative-AI backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Backend label for logs ("gemini/gemini-2.0-flash", "openai/gpt-4.1-mini").
    fn name(&self) -> &str;

    /// Send the request and wait for the complete reply.
    async fn generate(&self, request: &ModelRequest) -> Result<String, AnalysisError>;

    /// Send the request and receive the reply incrementally.
    ///
    /// The default implementation waits for [`Self::generate`] and yields the
    /// reply as one fragment.
    async fn generate_stream(&self, request: &ModelRequest) -> Result<TextStream, AnalysisError> {
        let text = self.generate(request).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

/// Resolve the model backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name`), built through
///    edgequake-llm, which reads the provider's own API key variable.
/// 3. **Gemini** with `config.api_key`, else `GOOGLE_API_KEY`, else
///    `GEMINI_API_KEY`.
///
/// A missing credential is a [`SummizeError::Configuration`]: callers resolve
/// the backend once at startup so the process never starts half-configured.
pub fn resolve_model(config: &AppConfig) -> Result<Arc<dyn GenerativeModel>, SummizeError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        let model = ProviderModel::create(name, &config.model)?;
        info!("Using edgequake-llm provider {}", model.name());
        return Ok(Arc::new(model));
    }

    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(api_key_from_env)
        .ok_or_else(|| SummizeError::Configuration {
            backend: "gemini".to_string(),
            hint: "No API key found. Set GOOGLE_API_KEY (or GEMINI_API_KEY), pass --api-key, \
                   or choose another provider with --provider."
                .to_string(),
        })?;

    let model = ProviderModel::gemini(api_key, &config.model);
    info!("Using Gemini backend {}", model.name());
    Ok(Arc::new(model))
}

fn api_key_from_env() -> Option<String> {
    ["GOOGLE_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}
