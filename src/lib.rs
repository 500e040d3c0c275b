//! # summize
//!
//! Summarise research-paper PDFs and describe their figures with a
//! generative-AI model.
//!
//! Upload one PDF; its text and embedded images are extracted once and
//! cached. The model is asked for a three-part summary (research objective,
//! core methodology, key findings) and, per image, for its type and content
//! and the key data it conveys.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Extract   text + images via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 2. Cache     Arc<Extraction> keyed by FileId
//!  ├─ 3. Dispatch  summary + one job per image, sequential or concurrent
//!  ├─ 4. Model     edgequake-llm: Gemini (streaming) or any other provider
//!  ├─ 5. Polish    cosmetic cleanup of the replies
//!  └─ 6. Session   results land in slots guarded by request tickets
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use summize::{analyze_document, resolve_model, AppConfig, NoopProgressCallback};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Gemini key from GOOGLE_API_KEY / GEMINI_API_KEY
//!     let config = AppConfig::builder().build()?;
//!     let model = resolve_model(&config)?;
//!
//!     let bytes = std::fs::read("paper.pdf")?;
//!     let doc = summize::extract(&bytes)?;
//!     let report = analyze_document(
//!         model.as_ref(), &doc.text, &doc.images, &config, &NoopProgressCallback,
//!     ).await;
//!     println!("{}", report.summary.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Web front-end
//!
//! [`Controller`] holds the session and exposes one method per user action;
//! [`server::router`] maps them onto HTTP routes and serves a single-page UI.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `summize` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_document, analyze_images};
pub use cache::ExtractionCache;
pub use config::{AppConfig, AppConfigBuilder, CachePolicy, DispatchMode, VisionContext};
pub use controller::{Controller, DocumentView, ImageView, View};
pub use error::{AnalysisError, SummizeError};
pub use model::{resolve_model, GenerativeModel, ModelRequest, Part, ProviderModel, TextStream};
pub use output::{BatchReport, BatchStats, ImageResult, SummaryResult};
pub use pipeline::extract::{extract, extract_images, extract_text, Extraction};
pub use pipeline::llm::{analyze_image, summarize, summarize_stream};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback};
pub use server::{router, serve};
pub use session::{FileId, Session, Slot, Ticket};
pub use stream::{summary_events, SummaryEvent};
