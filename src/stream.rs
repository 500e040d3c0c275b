//! Streaming summary: a producer task feeding a channel of [`SummaryEvent`]s.
//!
//! The producer is spawned onto the runtime and always runs to completion.
//! The consumer (an SSE connection, the CLI) only reads; dropping the
//! returned stream stops delivery but not the request, so the `observer`
//! callback still sees every event. The controller uses the observer to keep
//! the session's summary slot up to date independently of the connection.

use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::model::GenerativeModel;
use crate::pipeline::{llm, postprocess};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Channel capacity between producer and consumer.
const EVENT_BUFFER: usize = 64;

/// One step of a streamed summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SummaryEvent {
    /// A new fragment arrived; `partial` is everything received so far.
    Chunk { fragment: String, partial: String },
    /// The reply is complete; `text` is the cleaned final summary.
    Done { text: String },
    /// The request failed; `message` is user-visible.
    Error { message: String },
}

impl SummaryEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SummaryEvent::Chunk { .. })
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            SummaryEvent::Chunk { .. } => "chunk",
            SummaryEvent::Done { .. } => "done",
            SummaryEvent::Error { .. } => "error",
        }
    }
}

/// Start summarising `text` in the background and return the event stream.
///
/// Exactly one terminal event (`Done` or `Error`) ends every stream.
/// Fragments without text are dropped; a reply that streams no text at all
/// ends in `Error`.
pub fn summary_events<F>(
    model: Arc<dyn GenerativeModel>,
    text: String,
    config: AppConfig,
    observer: F,
) -> ReceiverStream<SummaryEvent>
where
    F: FnMut(&SummaryEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let mut out = Emitter {
            tx,
            observer,
            delivering: true,
        };

        let mut fragments = match llm::summarize_stream(model.as_ref(), &text, &config).await {
            Ok(s) => s,
            Err(e) => {
                out.emit(SummaryEvent::Error {
                    message: e.to_string(),
                })
                .await;
                return;
            }
        };

        let mut partial = String::new();
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) if fragment.is_empty() => continue,
                Ok(fragment) => {
                    partial.push_str(&fragment);
                    out.emit(SummaryEvent::Chunk {
                        fragment,
                        partial: partial.clone(),
                    })
                    .await;
                }
                Err(e) => {
                    warn!("{e}");
                    out.emit(SummaryEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                    return;
                }
            }
        }

        let last = if partial.trim().is_empty() {
            SummaryEvent::Error {
                message: AnalysisError::EmptyResponse {
                    job: llm::SUMMARY_JOB.to_string(),
                }
                .to_string(),
            }
        } else {
            info!("Streamed summary complete ({} chars)", partial.len());
            SummaryEvent::Done {
                text: postprocess::clean_reply(&partial),
            }
        };
        out.emit(last).await;
    });

    ReceiverStream::new(rx)
}

struct Emitter<F> {
    tx: mpsc::Sender<SummaryEvent>,
    observer: F,
    delivering: bool,
}

impl<F: FnMut(&SummaryEvent)> Emitter<F> {
    async fn emit(&mut self, event: SummaryEvent) {
        (self.observer)(&event);
        if self.delivering && self.tx.send(event).await.is_err() {
            debug!("summary stream consumer went away; finishing in the background");
            self.delivering = false;
        }
    }
}
