// src/model/mod.rs
// Model Client: rate-limited, bounded-concurrency, retrying wrapper
// around an external generative model, with a deterministic mock path.

pub mod fallback;
pub mod heuristics;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::config::ModelConfig;
use crate::domain::{InsightsResult, PiiResult, SentimentResult, SummaryResult};
use crate::error::ModelError;

use rate_limit::RateLimiter;

/// Minimal context a worker hands to the Model Client: the compressed
/// history (the current summary's `tldr`, if any) plus the message under
/// analysis, rendered as `"Context: {summary}\n\nCurrent message: {latest}"`.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub tenant_id: String,
    pub conversation_id: String,
    pub offset: i64,
    pub summary_context: Option<String>,
    pub message: String,
}

impl AnalysisContext {
    pub fn prompt(&self) -> String {
        format!(
            "Context: {}\n\nCurrent message: {}",
            self.summary_context.as_deref().unwrap_or(""),
            self.message
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawModelResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    prompt: &'a str,
}

pub struct ModelClient {
    config: ModelConfig,
    http: Client,
    rate_limiter: RateLimiter,
    semaphore: Arc<Semaphore>,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.requests_per_minute);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests));
        Self {
            http: Client::new(),
            rate_limiter,
            semaphore,
            config,
        }
    }

    pub async fn analyze_sentiment(&self, ctx: &AnalysisContext) -> SentimentResult {
        if self.config.mock_mode {
            let _permit = self.acquire().await;
            return heuristics::analyze_sentiment(&ctx.tenant_id, &ctx.conversation_id, ctx.offset, &ctx.message);
        }
        match self.call_remote(&ctx.prompt()).await {
            Ok(_raw) => {
                // A real provider integration would parse `_raw.text` into
                // the structured shape; absent a live provider this path is
                // exercised only behind a configured `endpoint`.
                heuristics::analyze_sentiment(&ctx.tenant_id, &ctx.conversation_id, ctx.offset, &ctx.message)
            }
            Err(e) => {
                warn!(error = %e, "sentiment analysis permanently failed, using fallback");
                crate::metrics::record_fallback();
                fallback::sentiment_fallback(&ctx.tenant_id, &ctx.conversation_id, ctx.offset)
            }
        }
    }

    pub async fn detect_pii(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        offset: i64,
        text: &str,
    ) -> PiiResult {
        if self.config.mock_mode {
            let _permit = self.acquire().await;
            return heuristics::detect_pii(tenant_id, conversation_id, offset, text);
        }
        match self.call_remote(text).await {
            Ok(_raw) => heuristics::detect_pii(tenant_id, conversation_id, offset, text),
            Err(e) => {
                warn!(error = %e, "pii detection permanently failed, using fallback");
                crate::metrics::record_fallback();
                fallback::pii_fallback(tenant_id, conversation_id, offset, text)
            }
        }
    }

    pub async fn extract_insights(&self, ctx: &AnalysisContext) -> InsightsResult {
        if self.config.mock_mode {
            let _permit = self.acquire().await;
            return heuristics::extract_insights(&ctx.tenant_id, &ctx.conversation_id, ctx.offset, &ctx.message);
        }
        match self.call_remote(&ctx.prompt()).await {
            Ok(_raw) => heuristics::extract_insights(&ctx.tenant_id, &ctx.conversation_id, ctx.offset, &ctx.message),
            Err(e) => {
                warn!(error = %e, "insight extraction permanently failed, using fallback");
                crate::metrics::record_fallback();
                fallback::insights_fallback(&ctx.tenant_id, &ctx.conversation_id, ctx.offset)
            }
        }
    }

    pub async fn update_summary(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        version: i64,
        old_summary: Option<&SummaryResult>,
        window_texts: &[String],
        new_message: &str,
    ) -> SummaryResult {
        if self.config.mock_mode {
            let _permit = self.acquire().await;
            return heuristics::update_summary(
                tenant_id,
                conversation_id,
                version,
                old_summary,
                window_texts,
                new_message,
            );
        }
        match self.call_remote(new_message).await {
            Ok(_raw) => heuristics::update_summary(
                tenant_id,
                conversation_id,
                version,
                old_summary,
                window_texts,
                new_message,
            ),
            Err(e) => {
                warn!(error = %e, "summary update permanently failed, using fallback");
                crate::metrics::record_fallback();
                fallback::summary_fallback(tenant_id, conversation_id, version, old_summary)
            }
        }
    }

    /// Free-form reply generation; not wired into any analyzer worker but
    /// exposed so callers outside the pipeline (e.g. an agent-assist
    /// surface) can reuse the same rate-limited, retrying transport.
    pub async fn generate_reply(&self, prompt: &str) -> Result<String, ModelError> {
        if self.config.mock_mode {
            let _permit = self.acquire().await;
            return Ok(format!("(mock reply) {}", truncate(prompt, 120)));
        }
        self.call_remote(prompt).await.map(|raw| raw.text)
    }

    async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        self.rate_limiter.acquire().await;
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }

    /// Rate-limited, bounded-concurrency call with exponential backoff
    /// retry (2s, 4s, 8s, jittered +/-20%) on transient failure.
    async fn call_remote(&self, prompt: &str) -> Result<RawModelResponse, ModelError> {
        let endpoint = match &self.config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => return Err(ModelError::Permanent("no model endpoint configured".into())),
        };

        let mut attempt = 0u32;
        loop {
            let _permit = self.acquire().await;
            let result = self.send_once(&endpoint, prompt).await;
            drop(_permit);

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let backoff = backoff_duration(attempt);
                    warn!(attempt, ?backoff, error = %err, "transient model error, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, endpoint: &str, prompt: &str) -> Result<RawModelResponse, ModelError> {
        let timeout = Duration::from_secs(self.config.request_timeout_seconds);
        let mut request = self.http.post(endpoint).json(&ModelRequest { prompt });
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| ModelError::Transient("request timed out".into()))?
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ModelError::Transient(e.to_string())
                } else {
                    ModelError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ModelError::Transient(format!("status {}", status)));
        }
        if !status.is_success() {
            return Err(ModelError::Permanent(format!("status {}", status)));
        }

        response
            .json::<RawModelResponse>()
            .await
            .map_err(|e| ModelError::ParseFailure(e.to_string()))
    }
}

fn backoff_duration(attempt: u32) -> Duration {
    let base_ms = 2_000u64 * 2u64.pow(attempt);
    let jitter_fraction = rand::rng().random_range(-0.2..=0.2);
    let jittered_ms = (base_ms as f64 * (1.0 + jitter_fraction)).max(0.0);
    Duration::from_millis(jittered_ms as u64)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
