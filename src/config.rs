//! Configuration types for document-to-deck conversion.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Deck cosmetics that an educator may want to
//! personalise (footer, byline) live in the nested [`DeckConfig`]; layout
//! geometry and colours are fixed in [`crate::pipeline::layout`].

use crate::error::DocDeckError;
use crate::pipeline::llm::QuestionExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Gemini model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Public Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Footer caption printed on every question slide.
pub const DEFAULT_FOOTER: &str = "HỆ THỐNG GIÁO DỤC HIỆN ĐẠI";

/// Caption under the question number.
pub const DEFAULT_QUESTION_CAPTION: &str = "CÂU HỎI";

/// Configuration for one conversion.
///
/// # Example
/// ```rust
/// use edgequake_doc2deck::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.0)
///     .byline("BIÊN SOẠN: TỔ HÓA HỌC")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Gemini model id. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API key. If None, `GEMINI_API_KEY` (then `API_KEY`) is read from the
    /// environment when the extractor is created.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, so the model should stay close to
    /// deterministic.
    pub temperature: f32,

    /// Custom system instruction. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Pre-constructed extractor. Takes precedence over model/api_key.
    pub extractor: Option<Arc<dyn QuestionExtractor>>,

    /// Receives stage events.
    pub progress_callback: Option<ProgressCallback>,

    /// Timeout for the generateContent call in seconds. Default: 300.
    ///
    /// A 50-question scan can take well over a minute to transcribe.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Deck cosmetics.
    pub deck: DeckConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
            system_prompt: None,
            extractor: None,
            progress_callback: None,
            api_timeout_secs: 300,
            download_timeout_secs: 120,
            deck: DeckConfig::default(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn QuestionExtractor>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("deck", &self.deck)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConversionConfigBuilder")
            .field(&self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn QuestionExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.config.deck.footer = footer.into();
        self
    }

    pub fn byline(mut self, byline: impl Into<String>) -> Self {
        self.config.deck.byline = Some(byline.into());
        self
    }

    pub fn deck(mut self, deck: DeckConfig) -> Self {
        self.config.deck = deck;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, DocDeckError> {
        let c = &self.config;
        if c.extractor.is_none() && c.model.trim().is_empty() {
            return Err(DocDeckError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(DocDeckError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if !c.temperature.is_finite() {
            return Err(DocDeckError::InvalidConfig(
                "temperature must be a finite number".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(DocDeckError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Personalisable text on the generated slides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Footer caption on every question slide. Default: [`DEFAULT_FOOTER`].
    pub footer: String,

    /// Author line under the title on the title slide. Default: none.
    pub byline: Option<String>,

    /// Caption under the question number. Default: [`DEFAULT_QUESTION_CAPTION`].
    pub question_caption: String,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            footer: DEFAULT_FOOTER.to_string(),
            byline: None,
            question_caption: DEFAULT_QUESTION_CAPTION.to_string(),
        }
    }
}
