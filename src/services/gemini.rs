use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ApiError;
use crate::services::retry::{RetryPolicy, Sleeper, TokioSleeper};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// One HTTP exchange with the `generateContent` endpoint.
///
/// An `Err` means the exchange itself failed (connection, timeout,
/// non-2xx status, unreadable body) and is worth retrying.
#[async_trait::async_trait]
pub trait GeminiTransport: Send + Sync {
    async fn generate_content(&self, request: &GeminiRequest) -> Result<Value>;
}

pub struct HttpTransport {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model,
            base_url,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

#[async_trait::async_trait]
impl GeminiTransport for HttpTransport {
    async fn generate_content(&self, request: &GeminiRequest) -> Result<Value> {
        log::debug!(
            "📤 Sending request to Gemini ({}), payload size: {} bytes",
            self.model,
            serde_json::to_string(request)?.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        Ok(response.json().await?)
    }
}

/// Inference client: a single logical request/response exchange with
/// bounded retry in front of the transport.
pub struct GeminiService {
    transport: Arc<dyn GeminiTransport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiService {
    pub fn new(transport: Arc<dyn GeminiTransport>) -> Self {
        Self::with_retry(transport, RetryPolicy::default(), Arc::new(TokioSleeper))
    }

    pub fn with_retry(
        transport: Arc<dyn GeminiTransport>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    /// Returns the first text part of the first candidate.
    ///
    /// Transport failures are retried per the policy; a response without
    /// the candidate/content/parts path is returned as an error at once.
    pub async fn call(&self, request: &GeminiRequest) -> Result<String, ApiError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.generate_content(request).await {
                Ok(body) => return first_candidate_text(body),
                Err(e) => {
                    log::warn!("⚠️ API request failed on attempt {}: {:#}", attempt, e);
                    match self.policy.delay_after(attempt) {
                        Some(delay) => self.sleeper.sleep(delay).await,
                        None => {
                            log::error!("❌ Giving up after {} attempts", attempt);
                            return Err(ApiError::RetriesExhausted {
                                details: format!("{:#}", e),
                            });
                        }
                    }
                }
            }
        }
    }
}

fn first_candidate_text(body: Value) -> Result<String, ApiError> {
    match body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    {
        Some(text) => Ok(text.to_string()),
        None => {
            log::error!("❌ Invalid API response structure: {}", body);
            Err(ApiError::InvalidResponseStructure { details: body })
        }
    }
}
