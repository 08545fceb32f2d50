//! Question extraction: one Gemini `generateContent` call per document.
//!
//! The extractor is the only stage with network I/O and the only place where
//! "intelligence" lives. It is hidden behind [`QuestionExtractor`] so the rest
//! of the pipeline (and the tests) never depend on a live service.
//!
//! ## Request Layout
//!
//! 1. **systemInstruction**: the extraction rules from [`crate::prompts`]
//! 2. **user content**: the document as `inlineData`, then the short
//!    instruction text
//! 3. **generationConfig**: low temperature, JSON response MIME type and the
//!    response schema, thinking disabled
//!
//! ## Failure Mapping
//!
//! There is no retry. Anything that prevents a response from arriving maps to
//! [`DocDeckError::ServiceBusy`]; a response whose text is empty or does not
//! parse maps to [`DocDeckError::AnalysisFailed`].

use crate::config::ConversionConfig;
use crate::error::DocDeckError;
use crate::pipeline::encode::InlineDocument;
use crate::prompts::{response_schema, DEFAULT_SYSTEM_PROMPT, USER_INSTRUCTION};
use crate::quiz::ExtractionResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Env var holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback env var name used by the original web app.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Turns an encoded document into structured questions.
#[async_trait]
pub trait QuestionExtractor: Send + Sync {
    /// Extract every question of `document`. All-or-nothing.
    async fn extract(&self, document: &InlineDocument) -> Result<ExtractionResult, DocDeckError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// [`QuestionExtractor`] backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiExtractor {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    system_prompt: String,
}

impl std::fmt::Debug for GeminiExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiExtractor")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiExtractor {
    /// Build an extractor from the conversion config.
    ///
    /// The API key comes from `config.api_key`, then `GEMINI_API_KEY`, then
    /// `API_KEY`.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, DocDeckError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(api_key_from_env)
            .ok_or_else(|| DocDeckError::ProviderNotConfigured {
                provider: "gemini".to_string(),
                hint: format!("Set {API_KEY_ENV} or pass --api-key."),
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| DocDeckError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    /// Build an extractor using only environment variables and defaults.
    pub fn from_env() -> Result<Self, DocDeckError> {
        Self::from_config(&ConversionConfig::default())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// JSON body for one extraction request.
    pub fn build_request(&self, document: &InlineDocument) -> Result<Value, DocDeckError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: &self.system_prompt,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::Inline {
                        inline_data: document,
                    },
                    Part::Text {
                        text: USER_INSTRUCTION,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
                response_schema: response_schema(),
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };
        serde_json::to_value(&request)
            .map_err(|e| DocDeckError::Internal(format!("failed to encode request: {e}")))
    }
}

#[async_trait]
impl QuestionExtractor for GeminiExtractor {
    async fn extract(&self, document: &InlineDocument) -> Result<ExtractionResult, DocDeckError> {
        let start = Instant::now();
        info!("Requesting extraction from {} ({})", self.model, document.mime_type);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(document)?)
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini request failed: {}", e);
                DocDeckError::ServiceBusy {
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            warn!("Gemini returned HTTP {}: {}", status, snippet);
            return Err(DocDeckError::ServiceBusy {
                detail: format!("HTTP {status}: {snippet}"),
            });
        }

        let envelope: GenerateContentResponse = response.json().await.map_err(|e| {
            DocDeckError::AnalysisFailed {
                detail: format!("unreadable response envelope: {e}"),
            }
        })?;

        if let Some(usage) = &envelope.usage_metadata {
            debug!(
                "Extraction used {} input tokens, {} output tokens, {:?}",
                usage.prompt_token_count,
                usage.candidates_token_count,
                start.elapsed()
            );
        }

        parse_extraction(envelope.text().as_deref())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn api_key_from_env() -> Option<String> {
    [API_KEY_ENV, LEGACY_API_KEY_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.is_empty())
}

/// Parse the model's response text into an [`ExtractionResult`].
///
/// `None` and blank text are analysis failures, as is anything that is not a
/// schema-conformant JSON object. An outer ```` ```json ```` fence is
/// tolerated.
pub fn parse_extraction(text: Option<&str>) -> Result<ExtractionResult, DocDeckError> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(DocDeckError::AnalysisFailed {
            detail: "empty response text".to_string(),
        });
    }

    serde_json::from_str(strip_json_fence(text)).map_err(|e| DocDeckError::AnalysisFailed {
        detail: format!("response is not a valid extraction result: {e}"),
    })
}

fn strip_json_fence(text: &str) -> &str {
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text)
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: &'a InlineDocument,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
    response_schema: Value,
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate, like the SDK's `.text`.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{QuestionBody, QuestionKind};

    fn extractor() -> GeminiExtractor {
        let config = ConversionConfig::builder()
            .api_key("test-key")
            .model("gemini-test")
            .build()
            .unwrap();
        GeminiExtractor::from_config(&config).unwrap()
    }

    #[test]
    fn request_carries_document_instruction_and_schema() {
        let doc = InlineDocument {
            mime_type: "application/pdf".into(),
            data: "JVBERi0=".into(),
        };
        let body = extractor().build_request(&doc).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERi0=");
        assert_eq!(parts[1]["text"], USER_INSTRUCTION);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            DEFAULT_SYSTEM_PROMPT
        );
        assert!(body["systemInstruction"].get("role").is_none());

        let gen = &body["generationConfig"];
        assert_eq!(gen["responseMimeType"], "application/json");
        assert_eq!(gen["thinkingConfig"]["thinkingBudget"], 0);
        assert_eq!(gen["responseSchema"]["required"][0], "title");
        assert!((gen["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn custom_system_prompt_is_used() {
        let config = ConversionConfig::builder()
            .api_key("k")
            .system_prompt("Extract questions.")
            .build()
            .unwrap();
        let ex = GeminiExtractor::from_config(&config).unwrap();
        let body = ex.build_request(&InlineDocument {
            mime_type: "image/png".into(),
            data: String::new(),
        })
        .unwrap();
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Extract questions."
        );
    }

    #[test]
    fn endpoint_includes_model() {
        let config = ConversionConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/")
            .model("gemini-2.5-flash")
            .build()
            .unwrap();
        let ex = GeminiExtractor::from_config(&config).unwrap();
        assert_eq!(
            ex.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let dbg = format!("{:?}", extractor());
        assert!(!dbg.contains("test-key"));
    }

    #[test]
    fn empty_text_is_analysis_failure() {
        for text in [None, Some(""), Some("   \n")] {
            let err = parse_extraction(text).unwrap_err();
            assert!(
                matches!(err, DocDeckError::AnalysisFailed { .. }),
                "unexpected: {err:?}"
            );
        }
    }

    #[test]
    fn malformed_json_is_analysis_failure() {
        let err = parse_extraction(Some("{\"title\": \"x\", \"slides\": [")).unwrap_err();
        assert!(matches!(err, DocDeckError::AnalysisFailed { .. }));

        let err = parse_extraction(Some("{\"slides\": []}")).unwrap_err();
        assert!(matches!(err, DocDeckError::AnalysisFailed { .. }));
    }

    #[test]
    fn parses_schema_conformant_text() {
        let text = r#"{
            "title": "Bài kiểm tra Hóa 11",
            "slides": [
                {"id": "1", "type": "multiple_choice", "question": "Câu 1: Chất nào là nước?",
                 "options": [{"label":"A","text":"H₂O","isCorrect":true},
                             {"label":"B","text":"H₂O₂","isCorrect":false}]},
                {"id": "2", "type": "true_false", "question": "Câu 2: Xét các phát biểu",
                 "trueFalseParts": [{"label":"a","text":"Nước sôi ở 100°C","isCorrect":true}]},
                {"id": "3", "type": "short_answer", "question": "Câu 3: Số mol?", "shortAnswer": "0,25"}
            ]
        }"#;
        let result = parse_extraction(Some(text)).unwrap();
        assert_eq!(result.title, "Bài kiểm tra Hóa 11");
        assert_eq!(result.slides.len(), 3);
        assert_eq!(result.slides[1].kind(), QuestionKind::TrueFalse);
        assert_eq!(
            result.slides[2].body,
            QuestionBody::ShortAnswer {
                answer: "0,25".into()
            }
        );
    }

    #[test]
    fn tolerates_json_fence() {
        let text = "```json\n{\"title\":\"T\",\"slides\":[]}\n```";
        let result = parse_extraction(Some(text)).unwrap();
        assert_eq!(result.title, "T");
        assert!(result.slides.is_empty());
    }

    #[test]
    fn response_text_skips_thoughts_and_joins_parts() {
        let envelope: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"title\":\"A\","},
                    {"text": "\"slides\":[]}"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        }))
        .unwrap();
        assert_eq!(envelope.text().as_deref(), Some("{\"title\":\"A\",\"slides\":[]}"));
        assert_eq!(envelope.usage_metadata.unwrap().prompt_token_count, 12);
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let envelope: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .unwrap();
        assert!(envelope.text().is_none());
        assert!(matches!(
            parse_extraction(envelope.text().as_deref()),
            Err(DocDeckError::AnalysisFailed { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_service_busy() {
        // Port 9 (discard) on localhost is closed in test environments.
        let config = ConversionConfig::builder()
            .api_key("k")
            .base_url("http://127.0.0.1:9")
            .api_timeout_secs(2)
            .build()
            .unwrap();
        let ex = GeminiExtractor::from_config(&config).unwrap();
        let doc = InlineDocument {
            mime_type: "application/pdf".into(),
            data: "JVBERi0=".into(),
        };
        let err = ex.extract(&doc).await.unwrap_err();
        assert!(matches!(err, DocDeckError::ServiceBusy { .. }), "got {err:?}");
    }
}
