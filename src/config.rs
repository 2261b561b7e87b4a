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

//! # Configuration Module
//!
//! Run-level configuration for the pipeline and credential loading.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TerjemahError};
use crate::source::SourceLocation;

/// Environment variable holding the provider API credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Upstream dataset location used when none is configured.
pub const DEFAULT_SOURCE_URL: &str =
    "https://github.com/AhmedBaset/hadith-json/raw/refs/heads/main/db/by_book/the_9_books";

/// Models tried in rotation when the provider reports quota exhaustion.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
];

/// Configuration for a pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where book JSON files are read from.
    pub source: SourceLocation,
    /// Root directory for translated output.
    pub output_dir: PathBuf,
    /// Skip fields already recorded as done or already present in output.
    pub resume: bool,
    /// Maximum provider attempts per field before it is marked failed.
    pub max_retries: u32,
    /// Minimum interval between consecutive provider calls, in milliseconds.
    /// The default keeps a comfortable margin inside the free-tier quota.
    pub rate_limit_ms: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Worker threads issuing gateway calls.
    pub workers: usize,
    /// Estimated-token ceiling on a single translation input.
    pub max_input_tokens: usize,
    /// Provider models, in rotation order.
    pub models: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            source: SourceLocation::Url(DEFAULT_SOURCE_URL.to_string()),
            output_dir: PathBuf::from("hadiths"),
            resume: true,
            max_retries: 5,
            rate_limit_ms: 4000,
            request_timeout_secs: 300,
            workers: 2,
            max_input_tokens: 8192,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects configurations that can never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TerjemahError::pipeline("config", "workers must be at least 1"));
        }
        if self.models.is_empty() {
            return Err(TerjemahError::pipeline("config", "no provider models configured"));
        }
        Ok(())
    }
}

/// Reads the provider credential from the environment. Absence is a fatal
/// startup error; no work may begin without it.
pub fn api_key_from_env() -> Result<String> {
    match env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(TerjemahError::MissingCredential {
            var: API_KEY_VAR.to_string(),
        }),
    }
}
