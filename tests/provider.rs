//! `ProviderModel` over a recording edgequake-llm provider.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse, LlmError};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use summize::model::EncodedImage;
use summize::{AnalysisError, AppConfig, GenerativeModel, ModelRequest, ProviderModel};

#[derive(Default)]
struct Recorder {
    streaming: bool,
    reply: String,
    fragments: Vec<&'static str>,
    fail_with: Option<&'static str>,
    chats: Mutex<Vec<(Vec<ChatMessage>, Option<f32>, Option<usize>)>>,
    prompts: Mutex<Vec<String>>,
}

impl Recorder {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn streaming(fragments: &[&'static str]) -> Self {
        Self {
            streaming: true,
            reply: "whole reply".to_string(),
            fragments: fragments.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl LLMProvider for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn model(&self) -> &str {
        "recorder-1"
    }

    fn max_context_length(&self) -> usize {
        32_000
    }

    async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        self.chat(&[ChatMessage::user(prompt)], None).await
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.chat(&[ChatMessage::user(prompt)], Some(options)).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.chats.lock().unwrap().push((
            messages.to_vec(),
            options.and_then(|o| o.temperature),
            options.and_then(|o| o.max_tokens),
        ));
        if let Some(detail) = self.fail_with {
            return Err(LlmError::ApiError(detail.to_string()));
        }
        Ok(LLMResponse::new(self.reply.clone(), "recorder-1").with_usage(10, 5))
    }

    async fn stream(&self, prompt: &str) -> edgequake_llm::Result<BoxStream<'static, edgequake_llm::Result<String>>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(detail) = self.fail_with {
            return Err(LlmError::ApiError(detail.to_string()));
        }
        let items: Vec<edgequake_llm::Result<String>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        Ok(stream::iter(items).boxed())
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }
}

fn model(provider: &Arc<Recorder>) -> ProviderModel {
    ProviderModel::new(provider.clone(), "recorder/recorder-1")
}

fn request(job: &str) -> ModelRequest {
    let config = AppConfig::builder().temperature(0.2).max_tokens(512).build().unwrap();
    ModelRequest::new(job, &config).text("Summarise this paper.")
}

fn png() -> EncodedImage {
    EncodedImage {
        mime_type: "image/png".into(),
        data: "iVBORw0KGgo=".into(),
    }
}

#[tokio::test]
async fn generate_sends_one_user_message_with_options() {
    let provider = Arc::new(Recorder::replying("## Research Objective\nAttention."));
    let reply = model(&provider).generate(&request("summary")).await.unwrap();

    assert_eq!(reply, "## Research Objective\nAttention.");
    let chats = provider.chats.lock().unwrap();
    let (messages, temperature, max_tokens) = &chats[0];
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Summarise this paper.");
    assert_eq!(*temperature, Some(0.2));
    assert_eq!(*max_tokens, Some(512));
}

#[tokio::test]
async fn images_are_attached_and_texts_joined_in_order() {
    let provider = Arc::new(Recorder::replying("A bar chart."));
    let req = request("image #1").image(png()).text("What type of image is this?");

    model(&provider).generate(&req).await.unwrap();

    let chats = provider.chats.lock().unwrap();
    let message = &chats[0].0[0];
    assert_eq!(message.content, "Summarise this paper.\nWhat type of image is this?");
    let images = message.images.as_ref().expect("attached images");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].mime_type, "image/png");
    assert_eq!(images[0].data, "iVBORw0KGgo=");
}

#[tokio::test]
async fn provider_error_keeps_the_job() {
    let provider = Arc::new(Recorder {
        fail_with: Some("503 The model is overloaded."),
        ..Recorder::default()
    });

    let err = model(&provider).generate(&request("image #3")).await.unwrap_err();

    let AnalysisError::RemoteService { job, detail } = err else {
        panic!("expected a remote error, got {err:?}");
    };
    assert_eq!(job, "image #3");
    assert!(detail.contains("The model is overloaded."), "got: {detail}");
}

#[tokio::test]
async fn blank_reply_is_empty_response() {
    let provider = Arc::new(Recorder::replying("  \n"));
    let err = model(&provider).generate(&request("summary")).await.unwrap_err();
    assert_eq!(
        err,
        AnalysisError::EmptyResponse {
            job: "summary".into()
        }
    );
}

#[tokio::test]
async fn text_request_streams_from_the_provider() {
    let provider = Arc::new(Recorder::streaming(&["## Research ", "", "Objective\n", "Attention."]));

    let fragments: Vec<String> = model(&provider)
        .generate_stream(&request("summary"))
        .await
        .unwrap()
        .map(|f| f.unwrap())
        .collect()
        .await;

    assert_eq!(fragments, vec!["## Research ", "Objective\n", "Attention."]);
    assert_eq!(provider.prompts.lock().unwrap().as_slice(), ["Summarise this paper."]);
    assert!(provider.chats.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stream_falls_back_to_chat_without_streaming_support() {
    let provider = Arc::new(Recorder::replying("one piece"));

    let fragments: Vec<_> = model(&provider)
        .generate_stream(&request("summary"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(fragments, vec![Ok("one piece".to_string())]);
    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn request_with_images_never_uses_the_bare_prompt_stream() {
    let provider = Arc::new(Recorder::streaming(&["ignored"]));
    let req = request("image #2").image(png());

    let fragments: Vec<_> = model(&provider).generate_stream(&req).await.unwrap().collect().await;

    assert_eq!(fragments, vec![Ok("whole reply".to_string())]);
    assert!(provider.prompts.lock().unwrap().is_empty());
    assert_eq!(provider.chats.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn stream_start_failure_is_a_remote_error() {
    let provider = Arc::new(Recorder {
        streaming: true,
        fail_with: Some("Stream error: quota"),
        ..Recorder::default()
    });

    let err = match model(&provider).generate_stream(&request("summary")).await {
        Ok(_) => panic!("expected the stream to fail"),
        Err(e) => e,
    };
    assert!(matches!(err, AnalysisError::RemoteService { ref job, .. } if job == "summary"), "got: {err:?}");
}

#[test]
fn gemini_label_names_the_model() {
    let model = ProviderModel::gemini("test-key", "gemini-2.0-flash");
    assert_eq!(model.name(), "gemini/gemini-2.0-flash");
}
