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

//! # Error Module
//!
//! Canonical error taxonomy for the translation pipeline.
//!
//! Per-field translation failures (`InputTooLarge`, `TranslationUnavailable`,
//! `InvalidResponse`) are caught at the orchestrator boundary and downgraded
//! to failed ledger entries; they never abort a batch. `NotFound` and
//! `MissingCredential` are fatal and abort the run before (or at) the point
//! they are raised. `MalformedData` is fatal for the affected book only.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TerjemahError>;

/// Canonical error enumeration for the translation pipeline.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum TerjemahError {
    /// The source dataset has no book under the requested slug.
    #[error("book '{slug}' not found in source dataset")]
    NotFound { slug: String },

    /// The source data for a book does not match the upstream schema.
    #[error("malformed source data for '{slug}': {message}")]
    MalformedData { slug: String, message: String },

    /// The input text exceeds the gateway's token ceiling.
    #[error("input too large: estimated {tokens} tokens exceeds ceiling of {ceiling}")]
    InputTooLarge { tokens: usize, ceiling: usize },

    /// The translation provider kept failing after exhausting retries.
    #[error("translation unavailable after {attempts} attempts: {message}")]
    TranslationUnavailable { attempts: u32, message: String },

    /// The provider answered, but with an empty, refusing, or garbled body.
    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },

    /// The provider credential environment variable is not set.
    #[error("missing provider credential: environment variable {var} is not set")]
    MissingCredential { var: String },

    /// Errors originating from filesystem or network IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Failures that occur while orchestrating the pipeline itself.
    #[error("pipeline error at stage '{stage}': {message}")]
    Pipeline { stage: String, message: String },
}

impl From<io::Error> for TerjemahError {
    fn from(err: io::Error) -> Self {
        TerjemahError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TerjemahError {
    fn from(err: serde_json::Error) -> Self {
        TerjemahError::Serde(err.to_string())
    }
}

impl TerjemahError {
    /// Helper to construct not-found errors.
    pub fn not_found(slug: impl Into<String>) -> Self {
        TerjemahError::NotFound { slug: slug.into() }
    }

    /// Helper to construct malformed-data errors.
    pub fn malformed(slug: impl Into<String>, message: impl Into<String>) -> Self {
        TerjemahError::MalformedData {
            slug: slug.into(),
            message: message.into(),
        }
    }

    /// Helper to construct invalid-response errors.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        TerjemahError::InvalidResponse {
            message: message.into(),
        }
    }

    /// Helper to construct pipeline errors.
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        TerjemahError::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// True for errors that fail a single record field without aborting
    /// the batch.
    pub fn is_field_failure(&self) -> bool {
        matches!(
            self,
            TerjemahError::InputTooLarge { .. }
                | TerjemahError::TranslationUnavailable { .. }
                | TerjemahError::InvalidResponse { .. }
        )
    }
}
