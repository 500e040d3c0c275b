//! Session state: the current document and its result slots.
//!
//! ```text
//!             upload ok                     upload ok / failed
//!   Empty ─────────────▶ Loaded(file_id) ─────────────────────▶ Loaded(other) | Unreadable
//!     │                                                              │
//!     └───────────────── upload not a PDF ──▶ Unreadable(file_id) ◀──┘
//! ```
//!
//! Every result slot (the summary and one per image) moves
//! `Unrequested → Pending → Done | Failed`, and any state may start a new
//! attempt. Starting an attempt hands out a [`Ticket`]; writes with a ticket
//! from another file or an older attempt are rejected, so a slow background
//! job can never overwrite a newer result or leak into another document.
//!
//! The struct is plain data with no locking or I/O. The controller keeps it
//! behind a mutex and never holds that lock across an `.await`.

use crate::cache::ExtractionCache;
use crate::config::CachePolicy;
use crate::error::SummizeError;
use crate::pipeline::extract::Extraction;
use crate::pipeline::llm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque identifier of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Mint a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// State of one result slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Slot {
    Unrequested,
    /// In flight; `partial` grows while a summary streams.
    Pending { partial: String },
    Done { text: String },
    Failed { error: String },
}

impl Slot {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    /// Final text, if the slot is `Done`.
    pub fn text(&self) -> Option<&str> {
        match self {
            Slot::Done { text } => Some(text),
            _ => None,
        }
    }
}

/// Which slot a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Summary,
    Image(usize),
}

impl Target {
    fn job(&self) -> String {
        match self {
            Target::Summary => llm::SUMMARY_JOB.to_string(),
            Target::Image(i) => llm::image_job(*i),
        }
    }
}

/// Proof of which file and which attempt a pending result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub file_id: FileId,
    pub target: Target,
    attempt: u64,
}

#[derive(Debug, Clone)]
struct Tracked {
    slot: Slot,
    attempt: u64,
}

impl Tracked {
    fn new() -> Self {
        Self {
            slot: Slot::Unrequested,
            attempt: 0,
        }
    }
}

/// The current document as seen by the presentation layer.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub file_id: FileId,
    pub name: String,
    /// Set when the upload could not be extracted; no analysis is accepted then.
    pub error: Option<String>,
    pub page_count: usize,
    pub text_chars: usize,
    pub skipped_images: usize,
    summary: Tracked,
    images: Vec<Tracked>,
}

impl DocumentState {
    pub fn summary(&self) -> &Slot {
        &self.summary.slot
    }

    pub fn image(&self, index: usize) -> Option<&Slot> {
        self.images.get(index).map(|t| &t.slot)
    }

    pub fn image_slots(&self) -> impl Iterator<Item = &Slot> {
        self.images.iter().map(|t| &t.slot)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn tracked_mut(&mut self, target: Target) -> Result<&mut Tracked, SummizeError> {
        let total = self.images.len();
        match target {
            Target::Summary => Ok(&mut self.summary),
            Target::Image(index) => self
                .images
                .get_mut(index)
                .ok_or(SummizeError::ImageOutOfRange { index, total }),
        }
    }
}

/// All per-user state of the application.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<DocumentState>,
    cache: ExtractionCache,
}

impl Session {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            current: None,
            cache: ExtractionCache::new(policy),
        }
    }

    pub fn current(&self) -> Option<&DocumentState> {
        self.current.as_ref()
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Make a successfully extracted upload the current document.
    ///
    /// Clears every result slot of the previous document.
    pub fn load(&mut self, file_id: FileId, name: impl Into<String>, extraction: Extraction) {
        let name = name.into();
        let doc = DocumentState {
            file_id,
            name,
            error: None,
            page_count: extraction.page_count,
            text_chars: extraction.text.chars().count(),
            skipped_images: extraction.skipped_images,
            summary: Tracked::new(),
            images: vec![Tracked::new(); extraction.images.len()],
        };
        info!(
            "Loaded '{}' as {} ({} pages, {} images)",
            doc.name,
            file_id,
            doc.page_count,
            doc.images.len()
        );
        self.cache.insert(file_id, extraction);
        self.current = Some(doc);
    }

    /// Make an unreadable upload the current document, showing `detail` inline.
    pub fn mark_malformed(
        &mut self,
        file_id: FileId,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.cache.switch_to(&file_id);
        self.current = Some(DocumentState {
            file_id,
            name: name.into(),
            error: Some(detail.into()),
            page_count: 0,
            text_chars: 0,
            skipped_images: 0,
            summary: Tracked::new(),
            images: Vec::new(),
        });
    }

    /// Forget the current document and every cached extraction.
    pub fn reset(&mut self) {
        self.current = None;
        self.cache.clear();
    }

    /// The current document's id and extraction, if it can be analysed.
    pub fn document(&self) -> Result<(FileId, Arc<Extraction>), SummizeError> {
        let doc = self.current.as_ref().ok_or(SummizeError::NoDocument)?;
        if let Some(detail) = &doc.error {
            return Err(SummizeError::DocumentUnavailable {
                name: doc.name.clone(),
                detail: detail.clone(),
            });
        }
        let extraction = self
            .cache
            .get(&doc.file_id)
            .ok_or_else(|| SummizeError::Internal(format!("extraction of {} not cached", doc.file_id)))?;
        Ok((doc.file_id, extraction))
    }

    /// Extraction of `file_id`, only while it is the current document.
    pub fn extraction_of(&self, file_id: &FileId) -> Result<Arc<Extraction>, SummizeError> {
        match &self.current {
            Some(doc) if doc.file_id == *file_id => self.document().map(|(_, e)| e),
            _ => Err(SummizeError::StaleFile {
                file_id: file_id.to_string(),
            }),
        }
    }

    fn begin(&mut self, target: Target) -> Result<Ticket, SummizeError> {
        self.document()?;
        let doc = self.current.as_mut().ok_or(SummizeError::NoDocument)?;
        let file_id = doc.file_id;
        let tracked = doc.tracked_mut(target)?;
        tracked.attempt += 1;
        tracked.slot = Slot::Pending {
            partial: String::new(),
        };
        debug!("{} pending (attempt {})", target.job(), tracked.attempt);
        Ok(Ticket {
            file_id,
            target,
            attempt: tracked.attempt,
        })
    }

    fn slot_for(&mut self, ticket: &Ticket) -> Result<&mut Slot, SummizeError> {
        let doc = match self.current.as_mut() {
            Some(doc) if doc.file_id == ticket.file_id => doc,
            _ => {
                return Err(SummizeError::StaleFile {
                    file_id: ticket.file_id.to_string(),
                })
            }
        };
        let tracked = doc.tracked_mut(ticket.target)?;
        if tracked.attempt != ticket.attempt {
            return Err(SummizeError::Superseded {
                job: ticket.target.job(),
            });
        }
        Ok(&mut tracked.slot)
    }

    fn complete(&mut self, ticket: &Ticket, outcome: Result<String, String>) -> Result<(), SummizeError> {
        let slot = self.slot_for(ticket)?;
        *slot = match outcome {
            Ok(text) => Slot::Done { text },
            Err(error) => Slot::Failed { error },
        };
        Ok(())
    }

    /// Start a new summary attempt, discarding any previous result.
    pub fn begin_summary(&mut self) -> Result<Ticket, SummizeError> {
        self.begin(Target::Summary)
    }

    /// Append a streamed fragment to a pending summary.
    pub fn append_summary(&mut self, ticket: &Ticket, fragment: &str) -> Result<(), SummizeError> {
        match self.slot_for(ticket)? {
            Slot::Pending { partial } => {
                partial.push_str(fragment);
                Ok(())
            }
            _ => Err(SummizeError::Superseded {
                job: ticket.target.job(),
            }),
        }
    }

    pub fn complete_summary(
        &mut self,
        ticket: &Ticket,
        outcome: Result<String, String>,
    ) -> Result<(), SummizeError> {
        self.complete(ticket, outcome)
    }

    /// Start a new attempt for image `index`, discarding any previous result.
    pub fn begin_image(&mut self, index: usize) -> Result<Ticket, SummizeError> {
        self.begin(Target::Image(index))
    }

    pub fn complete_image(
        &mut self,
        ticket: &Ticket,
        outcome: Result<String, String>,
    ) -> Result<(), SummizeError> {
        self.complete(ticket, outcome)
    }
}
