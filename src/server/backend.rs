//! Single-shot text generation against the Hugging Face Inference API.
//!
//! The relay makes exactly one blocking call per request; no partial results
//! exist at this layer. The trait seam exists so the relay handler can be
//! exercised against an in-memory generator in tests.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const HF_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Fixed sampling parameters applied to every relay request. These are the
/// relay's policy; client-side config values are not forwarded.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub do_sample: bool,
    pub return_full_text: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            temperature: 0.7,
            top_p: 0.95,
            do_sample: true,
            return_full_text: false,
        }
    }
}

#[derive(Debug)]
pub enum BackendError {
    /// Transport-level failure talking to the inference API.
    Http(reqwest::Error),
    /// The inference API answered with a non-success status.
    Api { status: u16, message: String },
    /// The inference API answered 2xx but the body had no generated text.
    MalformedResponse(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Http(err) => write!(f, "inference request failed: {err}"),
            BackendError::Api { status, message } => {
                write!(f, "inference API error (status {status}): {message}")
            }
            BackendError::MalformedResponse(detail) => {
                write!(f, "unexpected inference response: {detail}")
            }
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Http(err)
    }
}

/// One completion call: prompt in, full generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError>;
}

pub struct HfGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HfGenerator {
    pub fn new() -> Self {
        Self::with_base_url(HF_INFERENCE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HfGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParams,
}

#[async_trait]
impl TextGenerator for HfGenerator {
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), model);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&HfRequest {
                inputs: prompt,
                parameters: params,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        extract_generated_text(&body)
            .ok_or_else(|| BackendError::MalformedResponse(body.to_string()))
    }
}

/// The inference API returns either `[{"generated_text": ...}]` or a bare
/// `{"generated_text": ...}` depending on the model pipeline.
fn extract_generated_text(body: &Value) -> Option<String> {
    let entry = match body {
        Value::Array(entries) => entries.first()?,
        other => other,
    };
    entry
        .get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_string)
}
