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

//! # Progress Ledger Module
//!
//! Durable record of translation progress at field granularity. Each
//! (book, chapter, record, field) unit carries a status, so re-runs skip
//! completed work and failed units remain visible for manual retry.
//!
//! The ledger is overwrite-on-persist: the whole map is serialized to one
//! JSON file through a temp-file rename, so a crash mid-persist never
//! corrupts previously recorded progress. Entry mutation is mutex-guarded
//! for shared access from worker threads; marking an already-done entry
//! done again is a no-op.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Which translated field of a unit an entry tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    ChapterName,
    Title,
    Narrator,
    Body,
}

impl TargetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::ChapterName => "chapter_name",
            TargetField::Title => "title",
            TargetField::Narrator => "narrator",
            TargetField::Body => "body",
        }
    }
}

/// Terminal states of a record-field unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
    Failed,
}

/// Stable reference to one translatable field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub book_id: i64,
    pub chapter_id: i64,
    /// `None` for chapter-name units, which have no record.
    pub record_id: Option<i64>,
    pub field: TargetField,
}

impl FieldRef {
    pub fn chapter_name(book_id: i64, chapter_id: i64) -> Self {
        FieldRef {
            book_id,
            chapter_id,
            record_id: None,
            field: TargetField::ChapterName,
        }
    }

    pub fn record(book_id: i64, chapter_id: i64, record_id: i64, field: TargetField) -> Self {
        FieldRef {
            book_id,
            chapter_id,
            record_id: Some(record_id),
            field,
        }
    }

    /// Ledger key, e.g. `3/12/4510/body` or `3/12/name/chapter_name`.
    pub fn key(&self) -> String {
        let record = match self.record_id {
            Some(id) => id.to_string(),
            None => "name".to_string(),
        };
        format!(
            "{}/{}/{}/{}",
            self.book_id,
            self.chapter_id,
            record,
            self.field.as_str()
        )
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One persisted progress entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEntry {
    #[serde(flatten)]
    pub reference: FieldRef,
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    entries: BTreeMap<String, ProgressEntry>,
}

/// Durable, mutex-guarded progress store.
pub struct ProgressLedger {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, ProgressEntry>>,
}

impl ProgressLedger {
    /// Loads the ledger from disk, starting empty when no file exists yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let file: LedgerFile = serde_json::from_str(&raw)?;
            file.entries
        } else {
            BTreeMap::new()
        };
        Ok(ProgressLedger {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_done(&self, reference: &FieldRef) -> bool {
        self.status(reference) == Some(TaskStatus::Done)
    }

    pub fn status(&self, reference: &FieldRef) -> Option<TaskStatus> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&reference.key()).map(|entry| entry.status)
    }

    /// Records a unit as done. Idempotent: a unit already done keeps its
    /// original timestamp.
    pub fn mark_done(&self, reference: &FieldRef) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = reference.key();
        if let Some(existing) = entries.get(&key) {
            if existing.status == TaskStatus::Done {
                return;
            }
        }
        let attempts = entries.get(&key).map(|e| e.attempts).unwrap_or(0);
        entries.insert(
            key,
            ProgressEntry {
                reference: reference.clone(),
                status: TaskStatus::Done,
                updated_at: Utc::now(),
                attempts,
            },
        );
    }

    /// Records a failed attempt on a unit, bumping its attempt count.
    pub fn mark_failed(&self, reference: &FieldRef) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = reference.key();
        let attempts = entries.get(&key).map(|e| e.attempts).unwrap_or(0) + 1;
        entries.insert(
            key,
            ProgressEntry {
                reference: reference.clone(),
                status: TaskStatus::Failed,
                updated_at: Utc::now(),
                attempts,
            },
        );
    }

    /// References of all units currently in the failed state, in key order.
    pub fn failed_refs(&self) -> Vec<FieldRef> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .values()
            .filter(|entry| entry.status == TaskStatus::Failed)
            .map(|entry| entry.reference.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the ledger to disk atomically (temp file + rename).
    pub fn persist(&self) -> Result<()> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let file = LedgerFile {
            version: 1,
            entries: entries.clone(),
        };
        let serialized = serde_json::to_string_pretty(&file)?;
        drop(entries);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
