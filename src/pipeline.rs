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

//! # Pipeline Orchestrator Module
//!
//! Drives the batch: books in input order, chapters in source order; for
//! each chapter the chapter name first, then each record's fields in a
//! fixed order (title, narrator, body) for reproducibility.
//!
//! Each record-field is one unit of work. Units already done (or already
//! present in output, when resuming) are skipped. Gateway calls run on a
//! bounded worker pool; results come back to the orchestrator thread,
//! which persists the output file and then the ledger after every
//! completed unit, so a crash loses at most the unit in flight. Per-field
//! failures are downgraded to failed ledger entries and never abort the
//! batch; `NotFound` on a requested book aborts the run, `MalformedData`
//! skips to the next book.
//!
//! Cancellation: when the shutdown flag is raised, workers stop picking up
//! units, in-flight units drain normally, and the ledger plus the failure
//! report are persisted before `run` returns.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::errors::{Result, TerjemahError};
use crate::gateway::Translator;
use crate::ledger::{FieldRef, ProgressLedger, TargetField};
use crate::model::{Book, ChapterNamesFile, HadithRecord};
use crate::prompt::PromptContext;
use crate::source::SourceReader;
use crate::writer::OutputWriter;

/// Ephemeral unit of work: one untranslated field.
#[derive(Clone, Debug)]
pub struct TranslationTask {
    pub reference: FieldRef,
    pub text: String,
    pub context: PromptContext,
}

/// Outcome counts for a run, plus the references still failed afterwards.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    /// Fields translated by this run.
    pub translated: usize,
    /// Fields skipped as already done or already present.
    pub skipped: usize,
    /// Fields that failed this run after exhausting retries.
    pub failed: usize,
    /// All references left in the failed state, for manual re-run.
    pub failed_refs: Vec<FieldRef>,
    /// True when the run was cut short by a user interrupt.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "translated: {}, skipped: {}, failed: {}",
            self.translated, self.skipped, self.failed
        )?;
        if self.interrupted {
            writeln!(f, "run interrupted by user; progress has been saved")?;
        }
        if !self.failed_refs.is_empty() {
            writeln!(f, "failed units (re-run to retry):")?;
            for reference in &self.failed_refs {
                writeln!(f, "  {reference}")?;
            }
        }
        Ok(())
    }
}

/// Batch driver wiring reader, gateway, ledger, and writer together.
pub struct Orchestrator<'a> {
    gateway: &'a dyn Translator,
    reader: &'a SourceReader,
    writer: &'a OutputWriter,
    ledger: &'a ProgressLedger,
    config: &'a PipelineConfig,
    cancel: &'a AtomicBool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        gateway: &'a dyn Translator,
        reader: &'a SourceReader,
        writer: &'a OutputWriter,
        ledger: &'a ProgressLedger,
        config: &'a PipelineConfig,
        cancel: &'a AtomicBool,
    ) -> Self {
        Orchestrator {
            gateway,
            reader,
            writer,
            ledger,
            config,
            cancel,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Runs the batch over the given collection slugs.
    pub fn run(&self, slugs: &[String]) -> Result<RunSummary> {
        self.config.validate()?;
        let mut summary = RunSummary::default();

        for slug in slugs {
            if self.cancelled() {
                break;
            }
            let book = match self.reader.read_book(slug) {
                Ok(book) => book,
                Err(err @ TerjemahError::NotFound { .. }) => {
                    // A requested book missing from the dataset means the
                    // feed itself is wrong; abort before burning quota.
                    self.finalize(&mut summary)?;
                    return Err(err);
                }
                Err(TerjemahError::MalformedData { slug, message }) => {
                    log::error!("skipping book '{slug}': malformed source data: {message}");
                    continue;
                }
                Err(err) => {
                    self.finalize(&mut summary)?;
                    return Err(err);
                }
            };
            self.process_book(&book, &mut summary)?;
        }

        self.finalize(&mut summary)?;
        Ok(summary)
    }

    fn finalize(&self, summary: &mut RunSummary) -> Result<()> {
        summary.interrupted = self.cancelled();
        self.ledger.persist()?;
        summary.failed_refs = self.ledger.failed_refs();
        if !summary.failed_refs.is_empty() {
            self.writer.write_failure_report(&summary.failed_refs)?;
        }
        Ok(())
    }

    fn process_book(&self, book: &Book, summary: &mut RunSummary) -> Result<()> {
        log::info!(
            "processing book '{}' (id {}, {} chapters, {} hadiths)",
            book.metadata.english.title,
            book.id,
            book.chapters.len(),
            book.hadiths.len()
        );

        self.process_chapter_names(book, summary)?;

        for chapter in &book.chapters {
            if self.cancelled() {
                break;
            }
            self.process_chapter(book, chapter.id, summary)?;
        }
        Ok(())
    }

    fn process_chapter_names(&self, book: &Book, summary: &mut RunSummary) -> Result<()> {
        let mut names = ChapterNamesFile::from_book(book);
        if self.config.resume {
            if let Some(existing) = self.writer.read_chapter_names(&book.slug)? {
                names.merge_existing(&existing);
            }
        }

        let mut tasks = Vec::new();
        for chapter in &names.chapters {
            let reference = FieldRef::chapter_name(book.id, chapter.id);
            if self.should_skip(&reference, chapter.malay.is_some()) {
                summary.skipped += 1;
                continue;
            }
            if chapter.english.trim().is_empty() {
                log::debug!("no source text for {reference}");
                continue;
            }
            tasks.push(TranslationTask {
                reference,
                text: chapter.english.clone(),
                context: PromptContext::ChapterName,
            });
        }

        // Establish the file up front so a crash mid-chapter still leaves
        // valid JSON behind.
        self.writer.write_chapter_names(&book.slug, &names)?;

        let writer = self.writer;
        let slug = book.slug.clone();
        self.run_tasks(tasks, summary, |task, translated| {
            if let Some(chapter) = names
                .chapters
                .iter_mut()
                .find(|c| c.id == task.reference.chapter_id)
            {
                chapter.malay = Some(translated);
            }
            writer.write_chapter_names(&slug, &names)
        })
    }

    fn process_chapter(&self, book: &Book, chapter_id: i64, summary: &mut RunSummary) -> Result<()> {
        let source_records = book.hadiths_in_chapter(chapter_id);
        if source_records.is_empty() {
            return Ok(());
        }
        log::info!(
            "translating {} hadiths in chapter {} of '{}'",
            source_records.len(),
            chapter_id,
            book.slug
        );

        let mut records: Vec<HadithRecord> = source_records
            .iter()
            .map(|h| HadithRecord::from_source(h))
            .collect();
        if self.config.resume {
            if let Some(existing) = self.writer.read_chapter(&book.slug, chapter_id)? {
                for record in &mut records {
                    if let Some(prior) = existing.iter().find(|e| e.id == record.id) {
                        record.merge_existing(prior);
                    }
                }
            }
        }

        let mut tasks = Vec::new();
        for (source, record) in source_records.iter().zip(records.iter()) {
            for field in [TargetField::Title, TargetField::Narrator, TargetField::Body] {
                let reference = FieldRef::record(book.id, chapter_id, source.id, field);
                let (present, text, context) = match field {
                    TargetField::Title => (
                        record.title.is_some(),
                        source.body_source().to_string(),
                        PromptContext::Title,
                    ),
                    TargetField::Narrator => (
                        record.narrator.is_some(),
                        source.english.narrator.clone(),
                        PromptContext::Narrator,
                    ),
                    TargetField::Body => (
                        record.malay_translation.is_some(),
                        source.body_source().to_string(),
                        PromptContext::HadithBody,
                    ),
                    TargetField::ChapterName => unreachable!("record fields only"),
                };
                if self.should_skip(&reference, present) {
                    summary.skipped += 1;
                    continue;
                }
                if text.trim().is_empty() {
                    log::debug!("no source text for {reference}");
                    continue;
                }
                tasks.push(TranslationTask {
                    reference,
                    text,
                    context,
                });
            }
        }

        self.writer.write_chapter(&book.slug, chapter_id, &records)?;

        let writer = self.writer;
        let slug = book.slug.clone();
        self.run_tasks(tasks, summary, |task, translated| {
            if let Some(record) = records
                .iter_mut()
                .find(|r| Some(r.id) == task.reference.record_id)
            {
                match task.reference.field {
                    TargetField::Title => record.title = Some(translated),
                    TargetField::Narrator => record.narrator = Some(translated),
                    TargetField::Body => record.malay_translation = Some(translated),
                    TargetField::ChapterName => {}
                }
            }
            writer.write_chapter(&slug, chapter_id, &records)
        })
    }

    /// A unit is skipped only when resuming: either the ledger already has
    /// it done, or the output already carries a value for it.
    fn should_skip(&self, reference: &FieldRef, already_present: bool) -> bool {
        self.config.resume && (already_present || self.ledger.is_done(reference))
    }

    /// Fans tasks out to the worker pool and applies results on this
    /// thread. After every successful unit the output file is written
    /// first, then the ledger is marked and persisted, so the ledger never
    /// claims work the output does not have.
    fn run_tasks(
        &self,
        tasks: Vec<TranslationTask>,
        summary: &mut RunSummary,
        mut apply: impl FnMut(&TranslationTask, String) -> Result<()>,
    ) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let queue = Mutex::new(VecDeque::from(tasks));
        let (tx, rx) = mpsc::channel::<(TranslationTask, Result<String>)>();

        thread::scope(|scope| -> Result<()> {
            for _ in 0..self.config.workers {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || loop {
                    if self.cancelled() {
                        break;
                    }
                    let task = {
                        let mut pending = queue.lock().unwrap_or_else(|e| e.into_inner());
                        pending.pop_front()
                    };
                    let Some(task) = task else { break };
                    let outcome = self.gateway.translate(&task.text, task.context);
                    if tx.send((task, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (task, outcome) in rx {
                match outcome {
                    Ok(translated) => {
                        apply(&task, translated)?;
                        self.ledger.mark_done(&task.reference);
                        self.ledger.persist()?;
                        summary.translated += 1;
                        log::info!("translated {}", task.reference);
                    }
                    Err(err) if err.is_field_failure() => {
                        log::warn!("failed {}: {err}", task.reference);
                        self.ledger.mark_failed(&task.reference);
                        self.ledger.persist()?;
                        summary.failed += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        })
    }
}
