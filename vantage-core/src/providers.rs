//! External model collaborators behind provider traits.
//!
//! `ResearchProvider` covers the deep-research extraction call with its
//! lower-capability fallback mode; `SynthesisProvider` covers the four
//! synthesis completions. Both carry bounded timeouts at the HTTP client
//! level. `MockProvider` is exported for tests and dry runs.

use crate::config::LlmConfig;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Extraction collaborator for the research step.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Primary web-grounded deep-research call.
    async fn deep_research(&self, query: &str) -> Result<String, ProviderError>;

    /// Lower-capability fallback used when the primary call fails.
    async fn fallback_research(&self, query: &str) -> Result<String, ProviderError>;
}

/// Completion collaborator for the synthesis substeps.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// One synthesis completion (summary, insights, opportunities, or
    /// recommendations).
    async fn synthesize(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// OpenAI-backed provider using the Responses API for deep research and
/// synthesis, with chat completions as the research fallback.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    research_model: String,
    synthesis_model: String,
    fallback_model: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    /// Build a provider from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ConfigError::EnvVarMissing {
                var: config.api_key_env.clone(),
            }
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            research_model: config.research_model.clone(),
            synthesis_model: config.synthesis_model.clone(),
            fallback_model: config.fallback_model.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "issuing provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else if e.is_connect() {
                    ProviderError::Connection {
                        message: e.to_string(),
                    }
                } else {
                    ProviderError::ApiRequest {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthFailed {
                provider: "openai".into(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiRequest {
                message: format!("HTTP {status}: {body}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParse {
                message: e.to_string(),
            })
    }

    /// Pull the assistant text out of a Responses API payload.
    fn extract_output_text(value: &serde_json::Value) -> Result<String, ProviderError> {
        if let Some(text) = value.get("output_text").and_then(|v| v.as_str()) {
            return Ok(text.to_string());
        }
        // Older payloads nest the text under output[].content[].text.
        if let Some(items) = value.get("output").and_then(|v| v.as_array()) {
            let mut text = String::new();
            for item in items {
                if let Some(parts) = item.get("content").and_then(|v| v.as_array()) {
                    for part in parts {
                        if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
                            text.push_str(t);
                        }
                    }
                }
            }
            if !text.is_empty() {
                return Ok(text);
            }
        }
        Err(ProviderError::ResponseParse {
            message: "no output text in response".into(),
        })
    }
}

#[async_trait]
impl ResearchProvider for OpenAiProvider {
    async fn deep_research(&self, query: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.research_model,
            "tools": [{"type": "web_search"}],
            "input": query,
        });
        let value = self.post("/responses", body).await?;
        Self::extract_output_text(&value)
    }

    async fn fallback_research(&self, query: &str) -> Result<String, ProviderError> {
        warn!(model = %self.fallback_model, "primary research failed, using chat fallback");
        let body = json!({
            "model": self.fallback_model,
            "messages": [{"role": "user", "content": query}],
            "max_completion_tokens": 4000,
        });
        let value = self.post("/chat/completions", body).await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "no message content in chat response".into(),
            })
    }
}

#[async_trait]
impl SynthesisProvider for OpenAiProvider {
    async fn synthesize(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.synthesis_model,
            "input": prompt,
            "reasoning": {"effort": "medium"},
        });
        let value = self.post("/responses", body).await?;
        Self::extract_output_text(&value)
    }
}

/// Scriptable in-memory provider for tests and dry runs.
///
/// Queued responses are returned in order; when the queue is empty a canned
/// response is produced. Failures can be forced for the primary call or for
/// any query mentioning a given subject.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<Vec<String>>,
    fail_primary: bool,
    fail_subjects: Vec<String>,
    research_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that always returns `text`.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..20 {
            provider.queue_response(text);
        }
        provider
    }

    /// Queue a response for the next call.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push(text.to_string());
    }

    /// Fail every primary research call, exercising the fallback path.
    pub fn failing_primary(mut self) -> Self {
        self.fail_primary = true;
        self
    }

    /// Fail both research calls for any query mentioning `subject`.
    pub fn failing_for(mut self, subject: &str) -> Self {
        self.fail_subjects.push(subject.to_string());
        self
    }

    /// Number of primary research calls made so far.
    pub fn research_call_count(&self) -> usize {
        self.research_calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> String {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            "Mock research output.".to_string()
        } else {
            responses.remove(0)
        }
    }

    fn should_fail(&self, query: &str) -> bool {
        self.fail_subjects.iter().any(|s| query.contains(s.as_str()))
    }
}

#[async_trait]
impl ResearchProvider for MockProvider {
    async fn deep_research(&self, query: &str) -> Result<String, ProviderError> {
        self.research_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_primary || self.should_fail(query) {
            return Err(ProviderError::ApiRequest {
                message: "mock primary failure".into(),
            });
        }
        Ok(self.next_response())
    }

    async fn fallback_research(&self, query: &str) -> Result<String, ProviderError> {
        if self.should_fail(query) {
            return Err(ProviderError::ApiRequest {
                message: "mock fallback failure".into(),
            });
        }
        Ok(self.next_response())
    }
}

#[async_trait]
impl SynthesisProvider for MockProvider {
    async fn synthesize(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(self.next_response())
    }
}
