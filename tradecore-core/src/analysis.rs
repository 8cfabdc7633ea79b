//! Analysis engine client.
//!
//! One request per chat turn against an OpenAI-compatible chat-completions
//! endpoint (Perplexity Sonar by default, or a proxy that injects the key).
//! Only the latest prompt is sent; earlier turns are not replayed.

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::prompt::{system_prompt, IMAGE_NOTE};
use crate::types::AppSettings;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;

/// Fast, online model
pub const MODEL_FAST: &str = "sonar";
/// Slower reasoning model
pub const MODEL_PRO: &str = "sonar-reasoning";

/// Reply text used when the engine returns no completion
pub const NO_ANALYSIS: &str = "No analysis generated.";

const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.9;

/// Engine selection derived from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTier {
    /// Low latency
    Fast,
    /// Deep reasoning
    Deep,
}

impl EngineTier {
    pub fn from_settings(settings: &AppSettings) -> Self {
        if settings.use_pro_model {
            EngineTier::Deep
        } else {
            EngineTier::Fast
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            EngineTier::Fast => MODEL_FAST,
            EngineTier::Deep => MODEL_PRO,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EngineTier::Fast => "Sonar (Velocity)",
            EngineTier::Deep => "Sonar Reasoning (Deep)",
        }
    }
}

/// A role/content pair in the request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Request body for POST /chat/completions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub model: &'static str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub search_domain_filter: Vec<String>,
    pub return_images: bool,
}

impl AnalysisRequest {
    /// Build the request for one turn.
    ///
    /// Images are never transmitted; when any were attached a note is appended
    /// to the prompt instead. `thinking_budget` has no counterpart in this API.
    pub fn build(
        prompt: &str,
        has_images: bool,
        settings: &AppSettings,
        search_domains: &[String],
    ) -> Self {
        let mut user_content = prompt.to_string();
        if has_images {
            user_content.push_str(IMAGE_NOTE);
        }

        Self {
            model: EngineTier::from_settings(settings).model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            search_domain_filter: search_domains.to_vec(),
            return_images: false,
        }
    }

    /// The user message content as sent
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map_or("", |m| m.content.as_str())
    }
}

/// Completion interface for analysis turns.
///
/// `Ok(None)` means the engine answered without any completion text.
pub trait AnalysisClient: Send + Sync {
    fn complete(&self, request: &AnalysisRequest) -> Result<Option<String>>;
}

/// Create the default HTTP-backed analysis client.
pub fn create_analysis_client(config: &AnalysisConfig) -> Result<Box<dyn AnalysisClient>> {
    Ok(Box::new(HttpAnalysisClient::new(config)?))
}

/// Run one analysis call, mapping an empty completion to [`NO_ANALYSIS`].
pub fn analyze(client: &dyn AnalysisClient, request: &AnalysisRequest) -> Result<String> {
    tracing::debug!(model = request.model, "Sending analysis request");
    let reply = client.complete(request)?;
    Ok(reply.unwrap_or_else(|| NO_ANALYSIS.to_string()))
}

/// Extract `choices[0].message.content`, ignoring empty text.
fn parse_completion(body: &serde_json::Value) -> Option<String> {
    body.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Pull `error.message` (or a string `error`) out of an error body.
fn parse_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    error
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| error.as_str())
        .map(ToString::to_string)
}

struct HttpAnalysisClient {
    url: String,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl HttpAnalysisClient {
    fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        match config.resolved_api_key() {
            Some(api_key) => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", api_key))
                        .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
                );
            }
            None if config.targets_hosted_api() => {
                return Err(Error::MissingCredential(
                    "Server API Key configuration missing".to_string(),
                ));
            }
            None => {
                tracing::debug!(endpoint = %config.endpoint, "No API key; relying on proxy");
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Analysis(format!("failed to build tokio runtime: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Analysis(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            runtime,
            http,
        })
    }
}

impl AnalysisClient for HttpAnalysisClient {
    fn complete(&self, request: &AnalysisRequest) -> Result<Option<String>> {
        self.runtime.block_on(async {
            let resp = self
                .http
                .post(&self.url)
                .json(request)
                .send()
                .await
                .map_err(|e| Error::Analysis(format!("request failed: {e}")))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| Error::Analysis(format!("read body failed: {e}")))?;

            if !status.is_success() {
                let message = parse_error_message(&body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
                return Err(Error::Analysis(format!(
                    "API error ({}): {}",
                    status.as_u16(),
                    message
                )));
            }

            let json: serde_json::Value = serde_json::from_str(&body)?;
            Ok(parse_completion(&json))
        })
    }
}
