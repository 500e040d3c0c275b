//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ encode ──▶ llm ──▶ postprocess
//! (lopdf)    (base64)   (model)  (cleanup)
//! ```
//!
//! 1. [`extract`] — pull text and embedded images out of the PDF; CPU-bound,
//!    so async callers go through `spawn_blocking`
//! 2. [`encode`]  — decode each image blob and wrap it as a base64 PNG
//! 3. [`llm`]     — build the summary / image requests; the only stage with
//!    network I/O
//! 4. [`postprocess`] — cosmetic cleanup of final replies

pub mod encode;
pub mod extract;
pub mod llm;
pub mod postprocess;
