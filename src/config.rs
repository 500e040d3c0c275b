//! Configuration types for document analysis.
//!
//! All behaviour is controlled through [`AppConfig`], built via its
//! [`AppConfigBuilder`]. The CLI maps its flags (and their environment
//! fallbacks) onto the builder; library users set only what they need.

use crate::error::SummizeError;
use crate::model::GenerativeModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Default Gemini model used when neither `--model` nor a provider is given.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for the analysis pipeline and the web front-end.
///
/// # Example
/// ```rust
/// use summize::{AppConfig, DispatchMode};
///
/// let config = AppConfig::builder()
///     .api_key("test-key")
///     .concurrency(4)
///     .dispatch_mode(DispatchMode::Sequential)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct AppConfig {
    /// Model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini". Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, Gemini is not used.
    pub provider_name: Option<String>,

    /// Pre-constructed model backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn GenerativeModel>>,

    /// Gemini API key. When `None`, `GOOGLE_API_KEY` then `GEMINI_API_KEY` are read.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 4096.
    pub max_tokens: usize,

    /// Maximum number of in-flight model calls in concurrent mode. Default: 8.
    pub concurrency: usize,

    /// How "analyze all" dispatches its jobs. Default: [`DispatchMode::Concurrent`].
    pub dispatch_mode: DispatchMode,

    /// How much document text accompanies each image. Default: [`VisionContext::FullText`].
    pub vision_context: VisionContext,

    /// Language the model is asked to answer in. Default: "English".
    pub language: String,

    /// What happens to cached extractions when a new file is uploaded.
    pub cache_policy: CachePolicy,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Address the web front-end binds to. Default: 127.0.0.1:8501.
    pub bind: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            backend: None,
            api_key: None,
            temperature: 0.2,
            max_tokens: 4096,
            concurrency: 8,
            dispatch_mode: DispatchMode::default(),
            vision_context: VisionContext::default(),
            language: "English".to_string(),
            cache_policy: CachePolicy::default(),
            max_upload_bytes: 50 * 1024 * 1024,
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("concurrency", &self.concurrency)
            .field("dispatch_mode", &self.dispatch_mode)
            .field("vision_context", &self.vision_context)
            .field("language", &self.language)
            .field("cache_policy", &self.cache_policy)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("bind", &self.bind)
            .finish()
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerativeModel>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    pub fn vision_context(mut self, ctx: VisionContext) -> Self {
        self.config.vision_context = ctx;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.config.cache_policy = policy;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, SummizeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SummizeError::InvalidConfig("Model name must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(SummizeError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_upload_bytes < 1024 {
            return Err(SummizeError::InvalidConfig(format!(
                "max_upload_bytes must be ≥ 1024, got {}",
                c.max_upload_bytes
            )));
        }
        if c.language.trim().is_empty() {
            return Err(SummizeError::InvalidConfig("Language must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the summary job and the image jobs of one "analyze all" are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Summary first, then one image after another; each result is published
    /// as soon as it completes.
    Sequential,
    /// All jobs in flight together (bounded by `concurrency`); results are
    /// published once every job has finished. (default)
    #[default]
    Concurrent,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "concurrent" | "parallel" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown dispatch mode '{other}' (expected sequential or concurrent)"
            )),
        }
    }
}

/// How much of the document text is sent along with each image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisionContext {
    /// The image is analysed on its own.
    None,
    /// The whole extracted text precedes the image. (default)
    #[default]
    FullText,
    /// Only the first `n` characters of the text are sent.
    Leading(usize),
}

impl VisionContext {
    /// Select the context text for an image request, if any.
    pub fn apply<'a>(&self, text: &'a str) -> Option<&'a str> {
        let selected = match self {
            VisionContext::None => return None,
            VisionContext::FullText => text,
            VisionContext::Leading(n) => match text.char_indices().nth(*n) {
                Some((byte_idx, _)) => &text[..byte_idx],
                None => text,
            },
        };
        if selected.trim().is_empty() {
            None
        } else {
            Some(selected)
        }
    }
}

impl FromStr for VisionContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "full" | "fulltext" | "full-text" => Ok(Self::FullText),
            other => other
                .parse::<usize>()
                .map(Self::Leading)
                .map_err(|_| format!("unknown vision context '{s}' (expected none, full or a character count)")),
        }
    }
}

/// What the extraction cache keeps when the current file changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Drop every entry that does not belong to the new file. (default)
    #[default]
    EvictOnNewFile,
    /// Keep every extraction for the lifetime of the process.
    Unbounded,
}
