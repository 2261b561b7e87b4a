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

//! # Terjemah Hadith
//!
//! Resumable batch pipeline translating canonical Hadith collections into
//! Malay (Malaysia), producing per-chapter JSON files plus per-book
//! metadata files.
//!
//! ## Module Overview
//!
//! - **model**: source-side and output-side data structures
//! - **source**: reader over the upstream hadith-json dataset
//! - **prompt**: context-specific prompt templates and token estimation
//! - **gateway**: rate-limited, retrying wrapper around the translation
//!   provider
//! - **ledger**: durable per-field progress store enabling resumable runs
//! - **writer**: atomic JSON output in the published layout
//! - **pipeline**: the batch orchestrator tying everything together
//! - **config**: run configuration and credential loading
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TerjemahError>`. Per-field translation
//! failures are downgraded to failed ledger entries at the orchestrator
//! boundary; fatal errors (missing credential, book not in the dataset)
//! abort the run.

pub mod config;
pub mod errors;
pub mod gateway;
pub mod ledger;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod source;
pub mod writer;

pub use config::{api_key_from_env, PipelineConfig};
pub use errors::{Result, TerjemahError};
pub use gateway::{
    GatewayConfig, HttpTransport, TranslationGateway, Translator, Transport, TransportError,
};
pub use ledger::{FieldRef, ProgressLedger, TargetField, TaskStatus};
pub use model::{Book, ChapterName, ChapterNamesFile, HadithRecord};
pub use pipeline::{Orchestrator, RunSummary, TranslationTask};
pub use prompt::PromptContext;
pub use source::{SourceLocation, SourceReader};
pub use writer::OutputWriter;
