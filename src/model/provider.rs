//! edgequake-llm backend.
//!
//! Every model call goes through an `edgequake_llm::LLMProvider`: Gemini
//! (the default) or any provider known to `ProviderFactory` (OpenAI,
//! Anthropic, Mistral, Ollama, LM Studio, …). The multi-part request is
//! flattened into one user message: the text parts joined in order, the
//! images attached to it.
//!
//! Text-only requests stream through `LLMProvider::stream` when the provider
//! supports it; everything else goes through `chat`.

use super::{GenerativeModel, ModelRequest, TextStream};
use crate::error::{AnalysisError, SummizeError};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, GeminiProvider, ImageData, LLMProvider, ProviderFactory,
};
use futures::{future, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A [`GenerativeModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Gemini through the Google AI API key.
    pub fn gemini(api_key: impl Into<String>, model: &str) -> Self {
        let provider = GeminiProvider::new(api_key).with_model(model);
        Self::new(Arc::new(provider), format!("gemini/{model}"))
    }

    /// Instantiate a named provider with the given model.
    ///
    /// The provider reads its own credential (`OPENAI_API_KEY`, …); a missing
    /// key surfaces here, at startup.
    pub fn create(provider_name: &str, model: &str) -> Result<Self, SummizeError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            SummizeError::Configuration {
                backend: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}/{model}")))
    }

    fn prompt(request: &ModelRequest) -> String {
        request.texts().collect::<Vec<_>>().join("\n")
    }

    fn build_messages(request: &ModelRequest) -> Vec<ChatMessage> {
        let text = Self::prompt(request);
        let images: Vec<ImageData> = request
            .images()
            .map(|img| ImageData::new(img.data.clone(), img.mime_type.as_str()))
            .collect();

        if images.is_empty() {
            vec![ChatMessage::user(text)]
        } else {
            vec![ChatMessage::user_with_images(text, images)]
        }
    }
}

#[async_trait]
impl GenerativeModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &ModelRequest) -> Result<String, AnalysisError> {
        let start = Instant::now();
        let messages = Self::build_messages(request);
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| AnalysisError::remote(&request.job, e))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            request.job,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse {
                job: request.job.clone(),
            });
        }
        Ok(response.content)
    }

    async fn generate_stream(&self, request: &ModelRequest) -> Result<TextStream, AnalysisError> {
        // `stream` takes a bare prompt, so images force the one-shot path.
        if !self.provider.supports_streaming() || request.images().next().is_some() {
            let text = self.generate(request).await?;
            return Ok(Box::pin(futures::stream::once(async move { Ok(text) })));
        }

        let job = request.job.clone();
        let fragments = self
            .provider
            .stream(&Self::prompt(request))
            .await
            .map_err(|e| AnalysisError::remote(&job, e))?;
        debug!("{job}: streaming from {}", self.label);

        // Events that carry only usage metadata decode to empty fragments.
        let fragments = fragments
            .map(move |item| item.map_err(|e| AnalysisError::remote(&job, e)))
            .filter(|item| future::ready(!matches!(item, Ok(text) if text.is_empty())));
        Ok(Box::pin(fragments))
    }
}
