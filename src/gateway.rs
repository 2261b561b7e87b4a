//! Copyright © 2025-2026 Terjemah Hadith Team. All Rights Reserved.
//!
//! This file is part of Terjemah Hadith.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!   http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Translation Gateway Module
//!
//! The single component mediating all calls to the remote translation
//! provider. The gateway owns the rate-limit timer: every call, from any
//! worker, is paced through one mutex-guarded state block, so consecutive
//! provider calls are always separated by at least the configured minimum
//! interval.
//!
//! Failure handling, per call:
//! - transient transport failures (network, timeout, HTTP 5xx) retry with
//!   exponential backoff up to `max_retries` attempts;
//! - quota exhaustion (HTTP 429) counts a strike, and after
//!   `rotate_after_strikes` consecutive strikes the gateway advances to the
//!   next model in its rotation list;
//! - an empty or refusing response body earns exactly one extra
//!   same-request retry before `InvalidResponse` propagates.
//!
//! The clock and transport are both injectable so retry, backoff, and
//! pacing behavior are testable without real time or a real provider.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::PipelineConfig;
use crate::errors::{Result, TerjemahError};
use crate::prompt::{self, estimate_tokens, PromptContext};

/// Default Gemini REST endpoint root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Consecutive quota strikes tolerated before rotating models.
const ROTATE_AFTER_STRIKES: u32 = 4;

/// Backoff ceiling so a deep retry chain cannot stall a worker for minutes.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// The one operation the rest of the pipeline sees.
pub trait Translator: Send + Sync {
    /// Translates `text` into Malay under the given context. Consumes one
    /// unit of the provider's rate budget per underlying call.
    fn translate(&self, text: &str, context: PromptContext) -> Result<String>;
}

/// Transport-level failure classification, decided per HTTP exchange.
#[derive(Clone, Debug)]
pub enum TransportError {
    /// Provider quota exhausted (HTTP 429).
    RateLimited,
    /// Worth retrying: network error, timeout, HTTP 5xx.
    Transient(String),
    /// Not worth retrying: bad request, bad credential.
    Fatal(String),
}

/// Raw exchange with the provider. Returns the response text verbatim;
/// validation happens in the gateway.
pub trait Transport: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> std::result::Result<String, TransportError>;
}

/// Time source abstraction so backoff and pacing are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Gateway tuning knobs.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub min_interval: Duration,
    pub backoff_base: Duration,
    pub max_input_tokens: usize,
    pub models: Vec<String>,
}

impl GatewayConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        GatewayConfig {
            max_retries: config.max_retries,
            min_interval: config.rate_limit(),
            backoff_base: Duration::from_secs(2),
            max_input_tokens: config.max_input_tokens,
            models: config.models.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::from_pipeline(&PipelineConfig::default())
    }
}

/// Mutable state shared across workers, guarded by one mutex so the
/// gateway is the sole mutator of the rate-limit timer.
#[derive(Debug)]
struct GatewayState {
    last_call: Option<Instant>,
    model_index: usize,
    quota_strikes: u32,
}

/// Gateway over the remote translation capability.
pub struct TranslationGateway<T: Transport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    config: GatewayConfig,
    state: Mutex<GatewayState>,
}

impl<T: Transport, C: Clock> std::fmt::Debug for TranslationGateway<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationGateway")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> TranslationGateway<T, SystemClock> {
    pub fn new(transport: T, config: GatewayConfig) -> Result<Self> {
        Self::with_clock(transport, SystemClock, config)
    }
}

impl<T: Transport, C: Clock> TranslationGateway<T, C> {
    /// Fails when `config.models` is empty: the rotation index has no
    /// valid value without at least one model.
    pub fn with_clock(transport: T, clock: C, config: GatewayConfig) -> Result<Self> {
        if config.models.is_empty() {
            return Err(TerjemahError::pipeline(
                "gateway",
                "no provider models configured",
            ));
        }
        Ok(TranslationGateway {
            transport,
            clock,
            config,
            state: Mutex::new(GatewayState {
                last_call: None,
                model_index: 0,
                quota_strikes: 0,
            }),
        })
    }

    /// Waits out the minimum inter-call interval and reserves the next
    /// slot. Sleeping under the lock intentionally queues other workers:
    /// the provider quota is a single shared resource.
    fn pace(&self) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = state.last_call {
            let since = self.clock.now().saturating_duration_since(last);
            if since < self.config.min_interval {
                self.clock.sleep(self.config.min_interval - since);
            }
        }
        state.last_call = Some(self.clock.now());
        self.config.models[state.model_index % self.config.models.len()].clone()
    }

    /// Accessors for behavior tests driving a scripted transport.
    pub fn transport_ref(&self) -> &T {
        &self.transport
    }

    pub fn clock_ref(&self) -> &C {
        &self.clock
    }

    fn note_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.quota_strikes = 0;
    }

    fn note_rate_limited(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.quota_strikes += 1;
        if state.quota_strikes >= ROTATE_AFTER_STRIKES {
            state.model_index = (state.model_index + 1) % self.config.models.len();
            state.quota_strikes = 0;
            log::info!(
                "provider quota exhausted repeatedly, switching to model '{}'",
                self.config.models[state.model_index]
            );
        }
    }

    fn backoff(&self, attempt: u32) {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .config
            .backoff_base
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF);
        self.clock.sleep(delay);
    }
}

impl<T: Transport, C: Clock> Translator for TranslationGateway<T, C> {
    fn translate(&self, text: &str, context: PromptContext) -> Result<String> {
        let tokens = estimate_tokens(text);
        if tokens > self.config.max_input_tokens {
            return Err(TerjemahError::InputTooLarge {
                tokens,
                ceiling: self.config.max_input_tokens,
            });
        }

        let prompt = prompt::render(context, text);
        let mut invalid_retry_available = true;
        let mut attempts = 0u32;
        let mut last_error = String::from("no attempts made");

        while attempts < self.config.max_retries {
            let model = self.pace();
            match self.transport.generate(&model, &prompt) {
                Ok(raw) => match sanitize_response(&raw) {
                    Ok(clean) => {
                        self.note_success();
                        return Ok(clean);
                    }
                    Err(err) => {
                        if invalid_retry_available {
                            invalid_retry_available = false;
                            log::warn!("invalid response for {} request, retrying once: {err}", context.as_str());
                            continue;
                        }
                        return Err(err);
                    }
                },
                Err(TransportError::RateLimited) => {
                    attempts += 1;
                    last_error = "provider quota exhausted (429)".to_string();
                    log::warn!(
                        "rate limited on model '{model}' (attempt {attempts}/{})",
                        self.config.max_retries
                    );
                    self.note_rate_limited();
                    if attempts < self.config.max_retries {
                        self.backoff(attempts);
                    }
                }
                Err(TransportError::Transient(message)) => {
                    attempts += 1;
                    last_error = message;
                    log::warn!(
                        "transient provider failure (attempt {attempts}/{}): {last_error}",
                        self.config.max_retries
                    );
                    if attempts < self.config.max_retries {
                        self.backoff(attempts);
                    }
                }
                Err(TransportError::Fatal(message)) => {
                    return Err(TerjemahError::TranslationUnavailable {
                        attempts: attempts + 1,
                        message,
                    });
                }
            }
        }

        Err(TerjemahError::TranslationUnavailable {
            attempts,
            message: last_error,
        })
    }
}

/// Refusal prefixes the provider is known to emit instead of translating.
const REFUSAL_MARKERS: &[&str] = &[
    "i cannot",
    "i can't",
    "i am unable",
    "i'm unable",
    "as an ai",
    "saya tidak dapat",
    "maaf, saya tidak",
];

/// Strips markdown code fences the provider sometimes wraps around its
/// output, then rejects empty and refusal/error-echo responses.
pub fn sanitize_response(raw: &str) -> Result<String> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    if text.is_empty() {
        return Err(TerjemahError::invalid_response("empty response body"));
    }

    let lowered = text.to_lowercase();
    if REFUSAL_MARKERS.iter().any(|m| lowered.starts_with(m)) {
        return Err(TerjemahError::invalid_response(format!(
            "provider refused: {}",
            text.chars().take(80).collect::<String>()
        )));
    }
    if lowered.starts_with("error:") || lowered.starts_with("{\"error\"") {
        return Err(TerjemahError::invalid_response(format!(
            "provider echoed an error: {}",
            text.chars().take(80).collect::<String>()
        )));
    }

    Ok(text.to_string())
}

/// Blocking HTTP transport against the Gemini `generateContent` endpoint.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, timeout, GEMINI_BASE_URL.to_string())
    }

    /// Points the transport at a different endpoint root. Used by tests
    /// against a local stub server.
    pub fn with_base_url(api_key: String, timeout: Duration, base_url: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TerjemahError::Io(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpTransport {
            client,
            api_key,
            base_url,
            timeout,
        })
    }

    /// Pulls the concatenated candidate text out of a generateContent
    /// response. A response with no text (e.g. safety-blocked) yields an
    /// empty string, which the gateway's validation then rejects.
    fn extract_text(body: &Value) -> String {
        let mut out = String::new();
        if let Some(parts) = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
        {
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        }
        out
    }
}

impl Transport for HttpTransport {
    fn generate(&self, model: &str, prompt: &str) -> std::result::Result<String, TransportError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({"contents": [{"parts": [{"text": prompt}]}]});

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Transient("request timed out".to_string())
                } else {
                    TransportError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransportError::RateLimited);
        }
        if status.is_server_error() {
            return Err(TransportError::Transient(format!(
                "provider returned {status}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(TransportError::Fatal(format!(
                "provider returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: Value = response
            .json()
            .map_err(|e| TransportError::Transient(format!("unreadable response body: {e}")))?;
        Ok(Self::extract_text(&parsed))
    }
}
