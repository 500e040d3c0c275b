//! One handler per user action.
//!
//! Each method reads or mutates the [`Session`] and returns a [`View`]: a
//! serialisable description of what the page should show next. The HTTP layer
//! in [`crate::server`] is a thin adapter over these methods, and tests can
//! drive the whole application through them without a browser.
//!
//! The session mutex is only ever held for short synchronous sections. Model
//! calls happen with the lock released and their results are written back
//! with the [`Ticket`] obtained when the request started.

use crate::analyze;
use crate::config::{AppConfig, DispatchMode};
use crate::error::SummizeError;
use crate::model::{self, GenerativeModel};
use crate::output::{ImageResult, SummaryResult};
use crate::pipeline::{encode, extract, llm};
use crate::progress::AnalysisProgressCallback;
use crate::session::{FileId, Session, Slot, Target, Ticket};
use crate::stream::{self, SummaryEvent};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// What the presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    /// Transient message for the user ("Uploaded paper.pdf").
    pub notice: Option<String>,
    pub model: String,
    pub document: Option<DocumentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub file_id: FileId,
    pub name: String,
    pub page_count: usize,
    pub text_chars: usize,
    pub skipped_images: usize,
    /// Inline extraction error; when set, nothing can be analysed.
    pub error: Option<String>,
    pub summary: Slot,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub index: usize,
    pub url: String,
    pub mime_type: &'static str,
    pub analysis: Slot,
}

impl View {
    fn of(session: &Session, model: &str, notice: Option<String>) -> Self {
        let document = session.current().map(|doc| {
            let extraction = session.cache().get(&doc.file_id);
            let images = doc
                .image_slots()
                .enumerate()
                .map(|(index, slot)| ImageView {
                    index,
                    url: format!("/api/documents/{}/images/{}", doc.file_id, index),
                    mime_type: extraction
                        .as_ref()
                        .and_then(|e| e.images.get(index))
                        .map(|b| encode::mime_type_of(b))
                        .unwrap_or("application/octet-stream"),
                    analysis: slot.clone(),
                })
                .collect();
            DocumentView {
                file_id: doc.file_id,
                name: doc.name.clone(),
                page_count: doc.page_count,
                text_chars: doc.text_chars,
                skipped_images: doc.skipped_images,
                error: doc.error.clone(),
                summary: doc.summary().clone(),
                images,
            }
        });
        Self {
            notice,
            model: model.to_string(),
            document,
        }
    }
}

struct Inner {
    session: Mutex<Session>,
    model: Arc<dyn GenerativeModel>,
    config: AppConfig,
}

/// Application controller; cheap to clone, shared by every request handler.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write a finished result into its slot; stale results are dropped.
fn publish(session: &Mutex<Session>, ticket: &Ticket, outcome: Result<String, String>) {
    let mut session = lock(session);
    let written = match ticket.target {
        Target::Summary => session.complete_summary(ticket, outcome),
        Target::Image(_) => session.complete_image(ticket, outcome),
    };
    if let Err(e) = written {
        debug!("Discarded result: {e}");
    }
}

impl Controller {
    /// Build a controller, resolving the model backend from `config`.
    pub fn new(config: AppConfig) -> Result<Self, SummizeError> {
        let model = model::resolve_model(&config)?;
        Ok(Self::with_model(config, model))
    }

    pub fn with_model(config: AppConfig, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::new(config.cache_policy)),
                model,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.inner.session)
    }

    fn render(&self, notice: Option<String>) -> View {
        View::of(&self.session(), self.inner.model.name(), notice)
    }

    /// Current view, no side effects.
    pub fn view(&self) -> View {
        self.render(None)
    }

    /// Forget the current document.
    pub fn reset(&self) -> View {
        self.session().reset();
        self.render(Some("Session cleared".to_string()))
    }

    /// Accept an upload and make it the current document.
    ///
    /// Bytes that are not a readable PDF still become the current document,
    /// shown with an inline error; only a wrong media type is rejected outright.
    pub async fn upload(
        &self,
        name: Option<String>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<View, SummizeError> {
        if !is_pdf_media_type(content_type) {
            return Err(SummizeError::UnsupportedMediaType {
                content_type: content_type.to_string(),
            });
        }
        let file_id = FileId::new();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "document.pdf".to_string());
        info!("Upload '{}' ({} bytes) as {}", name, bytes.len(), file_id);

        match extract::extract_blocking(Arc::new(bytes)).await {
            Ok(extraction) => {
                let images = extraction.images.len();
                self.session().load(file_id, name.clone(), extraction);
                Ok(self.render(Some(format!("Loaded {name}: {images} images found"))))
            }
            Err(SummizeError::MalformedDocument { detail }) => {
                self.session().mark_malformed(file_id, name, detail);
                Ok(self.render(None))
            }
            Err(e) => Err(e),
        }
    }

    /// Raw bytes and MIME type of image `index` of `file_id`, while it is current.
    pub fn image_bytes(
        &self,
        file_id: &FileId,
        index: usize,
    ) -> Result<(Vec<u8>, &'static str), SummizeError> {
        let extraction = self.session().extraction_of(file_id)?;
        let total = extraction.images.len();
        let bytes = extraction
            .images
            .get(index)
            .ok_or(SummizeError::ImageOutOfRange { index, total })?;
        Ok((bytes.clone(), encode::mime_type_of(bytes)))
    }

    /// Summarise the current document and wait for the result.
    pub async fn summarize(&self) -> Result<View, SummizeError> {
        let (ticket, extraction) = {
            let mut session = self.session();
            let ticket = session.begin_summary()?;
            let (_, extraction) = session.document()?;
            (ticket, extraction)
        };

        let outcome = llm::summarize(self.inner.model.as_ref(), &extraction.text, &self.inner.config).await;
        publish(&self.inner.session, &ticket, outcome.map_err(|e| e.to_string()));
        Ok(self.view())
    }

    /// Summarise the current document, streaming the growing text.
    ///
    /// The session slot is updated from the producer task, so the result
    /// lands even if the caller stops reading.
    pub fn summarize_stream(&self) -> Result<ReceiverStream<SummaryEvent>, SummizeError> {
        let (ticket, extraction) = {
            let mut session = self.session();
            let ticket = session.begin_summary()?;
            let (_, extraction) = session.document()?;
            (ticket, extraction)
        };

        let inner = Arc::clone(&self.inner);
        let observer = move |event: &SummaryEvent| match event {
            SummaryEvent::Chunk { fragment, .. } => {
                if let Err(e) = lock(&inner.session).append_summary(&ticket, fragment) {
                    debug!("Discarded fragment: {e}");
                }
            }
            SummaryEvent::Done { text } => publish(&inner.session, &ticket, Ok(text.clone())),
            SummaryEvent::Error { message } => {
                publish(&inner.session, &ticket, Err(message.clone()))
            }
        };

        Ok(stream::summary_events(
            Arc::clone(&self.inner.model),
            extraction.text.clone(),
            self.inner.config.clone(),
            observer,
        ))
    }

    /// Describe image `index` of the current document.
    pub async fn analyze_image(&self, index: usize) -> Result<View, SummizeError> {
        let (ticket, extraction) = {
            let mut session = self.session();
            let ticket = session.begin_image(index)?;
            let (_, extraction) = session.document()?;
            (ticket, extraction)
        };

        let config = &self.inner.config;
        let context = config.vision_context.apply(&extraction.text);
        let outcome = llm::analyze_image(
            self.inner.model.as_ref(),
            index,
            &extraction.images[index],
            context,
            config,
        )
        .await;
        publish(&self.inner.session, &ticket, outcome.map_err(|e| e.to_string()));
        Ok(self.view())
    }

    /// Summary plus every image, dispatched per `mode` (configured default if `None`).
    ///
    /// Sequential runs publish each result as it completes; concurrent runs
    /// publish once everything has finished.
    pub async fn analyze_all(&self, mode: Option<DispatchMode>) -> Result<View, SummizeError> {
        let (summary_ticket, image_tickets, extraction) = {
            let mut session = self.session();
            let (_, extraction) = session.document()?;
            let summary = session.begin_summary()?;
            let images = (0..extraction.images.len())
                .map(|i| session.begin_image(i))
                .collect::<Result<Vec<_>, _>>()?;
            (summary, images, extraction)
        };

        let mut config = self.inner.config.clone();
        if let Some(mode) = mode {
            config.dispatch_mode = mode;
        }
        let publisher = Publisher {
            session: &self.inner.session,
            summary: summary_ticket,
            images: &image_tickets,
            live: config.dispatch_mode == DispatchMode::Sequential,
        };

        let report = analyze::analyze_document(
            self.inner.model.as_ref(),
            &extraction.text,
            &extraction.images,
            &config,
            &publisher,
        )
        .await;

        if !publisher.live {
            publisher.summary_done(&report.summary);
            for result in &report.images {
                publisher.image_done(result);
            }
        }

        let notice = format!(
            "Analysed {}/{} images",
            report.stats.succeeded_images, report.stats.total_images
        );
        Ok(self.render(Some(notice)))
    }
}

/// Routes dispatch completions into the session.
struct Publisher<'a> {
    session: &'a Mutex<Session>,
    summary: Ticket,
    images: &'a [Ticket],
    /// Publish from the callbacks rather than after the batch.
    live: bool,
}

impl Publisher<'_> {
    fn summary_done(&self, result: &SummaryResult) {
        publish(self.session, &self.summary, result.to_outcome());
    }

    fn image_done(&self, result: &ImageResult) {
        if let Some(ticket) = self.images.get(result.index) {
            publish(self.session, ticket, result.to_outcome());
        }
    }
}

impl AnalysisProgressCallback for Publisher<'_> {
    fn on_summary_complete(&self, result: &SummaryResult) {
        if self.live {
            self.summary_done(result);
        }
    }

    fn on_image_complete(&self, result: &ImageResult, _total_images: usize) {
        if self.live {
            self.image_done(result);
        }
    }
}

/// `application/pdf`, ignoring case and parameters.
fn is_pdf_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false)
}
