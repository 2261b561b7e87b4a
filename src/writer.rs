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

//! # Output Writer Module
//!
//! Serializes translated records into the published layout:
//!
//! ```text
//! hadiths/<collection_slug>/chapter_<chapter_id>.json   array of records
//! hadiths/<collection_slug>/chapter_names.json          metadata + chapters
//! hadiths/error_hadiths.json                            failed references
//! ```
//!
//! Every write is atomic from a reader's perspective: content goes to a
//! temp file in the same directory and is renamed into place, so a crash
//! mid-write never leaves a corrupt or partial JSON file visible.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;
use crate::ledger::FieldRef;
use crate::model::{ChapterNamesFile, HadithRecord};

/// Writer rooted at the output directory.
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OutputWriter { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chapter_path(&self, slug: &str, chapter_id: i64) -> PathBuf {
        self.root.join(slug).join(format!("chapter_{chapter_id}.json"))
    }

    pub fn chapter_names_path(&self, slug: &str) -> PathBuf {
        self.root.join(slug).join("chapter_names.json")
    }

    pub fn failure_report_path(&self) -> PathBuf {
        self.root.join("error_hadiths.json")
    }

    /// Persists a chapter's record array.
    pub fn write_chapter(
        &self,
        slug: &str,
        chapter_id: i64,
        records: &[HadithRecord],
    ) -> Result<()> {
        write_atomic(&self.chapter_path(slug, chapter_id), &records)
    }

    /// Loads a previously written chapter, if any. An unparsable file is
    /// treated as absent (and logged) rather than aborting the run.
    pub fn read_chapter(&self, slug: &str, chapter_id: i64) -> Result<Option<Vec<HadithRecord>>> {
        read_existing(&self.chapter_path(slug, chapter_id))
    }

    /// Persists the book metadata and chapter-name list.
    pub fn write_chapter_names(&self, slug: &str, file: &ChapterNamesFile) -> Result<()> {
        write_atomic(&self.chapter_names_path(slug), file)
    }

    pub fn read_chapter_names(&self, slug: &str) -> Result<Option<ChapterNamesFile>> {
        read_existing(&self.chapter_names_path(slug))
    }

    /// Writes the failed-reference report consumed by manual re-runs.
    pub fn write_failure_report(&self, refs: &[FieldRef]) -> Result<()> {
        write_atomic(&self.failure_report_path(), &refs)
    }
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = serde_json::to_string_pretty(value)?;
    let tmp = temp_path(path);
    fs::write(&tmp, serialized)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn read_existing<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            log::warn!(
                "could not decode existing output file {}, starting fresh: {err}",
                path.display()
            );
            Ok(None)
        }
    }
}
