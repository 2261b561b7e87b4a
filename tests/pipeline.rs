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

//! End-to-end orchestrator runs over an on-disk fixture dataset, with the
//! provider replaced by a scripted translator: completion, resume
//! idempotence, failure isolation, and cancellation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use terjemah_hadith::config::PipelineConfig;
use terjemah_hadith::errors::{Result, TerjemahError};
use terjemah_hadith::gateway::Translator;
use terjemah_hadith::ledger::{FieldRef, ProgressLedger, TargetField, TaskStatus};
use terjemah_hadith::pipeline::Orchestrator;
use terjemah_hadith::prompt::PromptContext;
use terjemah_hadith::source::{SourceLocation, SourceReader};
use terjemah_hadith::writer::OutputWriter;

/// Translator whose behavior is a plain function, with a call counter.
struct ScriptedGateway {
    calls: AtomicUsize,
    respond: Box<dyn Fn(&str, PromptContext) -> Result<String> + Send + Sync>,
}

impl ScriptedGateway {
    fn new(respond: impl Fn(&str, PromptContext) -> Result<String> + Send + Sync + 'static) -> Self {
        ScriptedGateway {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        }
    }

    /// Deterministic Malay-for-everything translator.
    fn echo() -> Self {
        Self::new(|text, context| Ok(format!("ms[{}]:{text}", context.as_str())))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Translator for ScriptedGateway {
    fn translate(&self, text: &str, context: PromptContext) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(text, context)
    }
}

/// Two chapters, two hadiths; hadith 123 carries the charity narration.
fn write_fixture_book(dir: &Path) {
    let book = serde_json::json!({
        "id": 1,
        "metadata": {
            "arabic": {"title": "صحيح البخاري", "author": "البخاري", "introduction": ""},
            "english": {"title": "Sahih al-Bukhari", "author": "al-Bukhari", "introduction": ""}
        },
        "chapters": [
            {"id": 1, "arabic": "الزكاة", "english": "Charity"},
            {"id": 2, "arabic": "الصوم", "english": "Fasting"}
        ],
        "hadiths": [
            {
                "id": 123, "chapterId": 1, "idInBook": 5,
                "arabic": "أفضل الصدقة صدقة في رمضان",
                "english": {
                    "narrator": "Narrated Anas:",
                    "text": "The best charity is that given in Ramadan."
                }
            },
            {
                "id": 124, "chapterId": 2, "idInBook": 6,
                "arabic": "الصوم جنة",
                "english": {
                    "narrator": "Narrated Abu Hurairah:",
                    "text": "Fasting is a shield."
                }
            }
        ]
    });
    std::fs::write(dir.join("bukhari.json"), book.to_string()).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    reader: SourceReader,
    writer: OutputWriter,
    ledger_path: std::path::PathBuf,
    config: PipelineConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db");
    std::fs::create_dir_all(&db).unwrap();
    write_fixture_book(&db);

    let out = dir.path().join("out");
    let config = PipelineConfig {
        source: SourceLocation::Dir(db.clone()),
        output_dir: out.clone(),
        workers: 1,
        ..PipelineConfig::default()
    };
    Fixture {
        reader: SourceReader::new(SourceLocation::Dir(db)).unwrap(),
        writer: OutputWriter::new(&out),
        ledger_path: out.join("progress.json"),
        config,
        _dir: dir,
    }
}

fn run(fx: &Fixture, gateway: &dyn Translator) -> Result<terjemah_hadith::pipeline::RunSummary> {
    let ledger = ProgressLedger::load(&fx.ledger_path)?;
    let cancel = AtomicBool::new(false);
    let orchestrator =
        Orchestrator::new(gateway, &fx.reader, &fx.writer, &ledger, &fx.config, &cancel);
    orchestrator.run(&["bukhari".to_string()])
}

#[test]
fn full_run_translates_every_field() {
    let fx = fixture();
    let gateway = ScriptedGateway::new(|text, context| {
        Ok(match (context, text) {
            (PromptContext::ChapterName, "Charity") => "Sedekah".to_string(),
            (PromptContext::ChapterName, "Fasting") => "Puasa".to_string(),
            (PromptContext::Narrator, "Narrated Anas:") => "Anas meriwayatkan:".to_string(),
            (PromptContext::HadithBody, "The best charity is that given in Ramadan.") => {
                "Sebaik-baik sedekah ialah sedekah yang diberikan pada bulan Ramadan.".to_string()
            }
            _ => format!("ms:{text}"),
        })
    });

    let summary = run(&fx, &gateway).unwrap();

    // 2 chapter names + 2 records x (title, narrator, body)
    assert_eq!(summary.translated, 8);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_success());

    let chapter = fx.writer.read_chapter("bukhari", 1).unwrap().unwrap();
    let hadith = chapter.iter().find(|r| r.id == 123).unwrap();
    assert_eq!(hadith.hadith_number, 5);
    assert_eq!(
        hadith.malay_translation.as_deref(),
        Some("Sebaik-baik sedekah ialah sedekah yang diberikan pada bulan Ramadan.")
    );
    assert_eq!(hadith.narrator.as_deref(), Some("Anas meriwayatkan:"));
    assert!(hadith.title.is_some());

    let names = fx.writer.read_chapter_names("bukhari").unwrap().unwrap();
    assert_eq!(names.chapters[0].malay.as_deref(), Some("Sedekah"));
    assert_eq!(names.chapters[1].malay.as_deref(), Some("Puasa"));

    let ledger = ProgressLedger::load(&fx.ledger_path).unwrap();
    assert_eq!(
        ledger.status(&FieldRef::record(1, 1, 123, TargetField::Body)),
        Some(TaskStatus::Done)
    );
}

#[test]
fn second_run_skips_everything_without_provider_calls() {
    let fx = fixture();

    let first = ScriptedGateway::echo();
    let summary = run(&fx, &first).unwrap();
    assert_eq!(summary.translated, 8);
    let bytes_after_first = std::fs::read(fx.writer.chapter_path("bukhari", 1)).unwrap();

    let second = ScriptedGateway::echo();
    let summary = run(&fx, &second).unwrap();

    assert_eq!(second.calls(), 0);
    assert_eq!(summary.translated, 0);
    assert_eq!(summary.skipped, 8);
    assert!(summary.is_success());

    // Output is unchanged by a no-op resume.
    let bytes_after_second = std::fs::read(fx.writer.chapter_path("bukhari", 1)).unwrap();
    assert_eq!(bytes_after_first, bytes_after_second);
}

#[test]
fn one_failing_field_does_not_block_the_rest() {
    let fx = fixture();
    let gateway = ScriptedGateway::new(|text, context| {
        if context == PromptContext::Narrator && text.contains("Anas") {
            return Err(TerjemahError::TranslationUnavailable {
                attempts: 5,
                message: "provider quota exhausted (429)".to_string(),
            });
        }
        Ok(format!("ms:{text}"))
    });

    let summary = run(&fx, &gateway).unwrap();
    assert_eq!(summary.translated, 7);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());

    let failed_ref = FieldRef::record(1, 1, 123, TargetField::Narrator);
    assert_eq!(summary.failed_refs, vec![failed_ref.clone()]);

    // Neighbouring fields of the same record still completed.
    let chapter = fx.writer.read_chapter("bukhari", 1).unwrap().unwrap();
    let hadith = chapter.iter().find(|r| r.id == 123).unwrap();
    assert!(hadith.narrator.is_none());
    assert!(hadith.malay_translation.is_some());

    // The failure lands in the report for manual follow-up.
    let raw = std::fs::read_to_string(fx.writer.failure_report_path()).unwrap();
    let report: Vec<FieldRef> = serde_json::from_str(&raw).unwrap();
    assert_eq!(report, vec![failed_ref.clone()]);

    // A later run retries only the failed unit and clears it.
    let retry = ScriptedGateway::echo();
    let summary = run(&fx, &retry).unwrap();
    assert_eq!(retry.calls(), 1);
    assert_eq!(summary.translated, 1);
    assert!(summary.failed_refs.is_empty());
    assert!(summary.is_success());

    let ledger = ProgressLedger::load(&fx.ledger_path).unwrap();
    assert_eq!(ledger.status(&failed_ref), Some(TaskStatus::Done));
}

#[test]
fn done_ledger_entries_always_have_output_values() {
    let fx = fixture();
    let gateway = ScriptedGateway::echo();
    run(&fx, &gateway).unwrap();

    let ledger = ProgressLedger::load(&fx.ledger_path).unwrap();
    for chapter_id in [1i64, 2] {
        let records = fx.writer.read_chapter("bukhari", chapter_id).unwrap().unwrap();
        for record in records {
            for field in [TargetField::Title, TargetField::Narrator, TargetField::Body] {
                let reference = FieldRef::record(1, chapter_id, record.id, field);
                if ledger.is_done(&reference) {
                    let value = match field {
                        TargetField::Title => &record.title,
                        TargetField::Narrator => &record.narrator,
                        TargetField::Body => &record.malay_translation,
                        TargetField::ChapterName => unreachable!(),
                    };
                    assert!(value.is_some(), "done unit {reference} has no value");
                }
            }
        }
    }
}

#[test]
fn raised_shutdown_flag_stops_the_run_before_any_call() {
    let fx = fixture();
    let gateway = ScriptedGateway::echo();
    let ledger = ProgressLedger::load(&fx.ledger_path).unwrap();
    let cancel = AtomicBool::new(true);

    let orchestrator =
        Orchestrator::new(&gateway, &fx.reader, &fx.writer, &ledger, &fx.config, &cancel);
    let summary = orchestrator.run(&["bukhari".to_string()]).unwrap();

    assert!(summary.interrupted);
    assert!(!summary.is_success());
    assert_eq!(summary.translated, 0);
    assert_eq!(gateway.calls(), 0);
}

#[test]
fn malformed_book_is_skipped_not_fatal() {
    let fx = fixture();
    std::fs::write(
        fx.config_source_dir().join("broken.json"),
        "{\"id\": \"oops\"}",
    )
    .unwrap();

    let gateway = ScriptedGateway::echo();
    let summary = run_books(&fx, &gateway, &["broken", "bukhari"]).unwrap();

    // The good book behind the broken one still gets translated.
    assert_eq!(summary.translated, 8);
}

impl Fixture {
    fn config_source_dir(&self) -> &Path {
        match &self.config.source {
            SourceLocation::Dir(path) => path,
            SourceLocation::Url(_) => unreachable!("fixtures are directory-backed"),
        }
    }
}

fn run_books(
    fx: &Fixture,
    gateway: &dyn Translator,
    slugs: &[&str],
) -> Result<terjemah_hadith::pipeline::RunSummary> {
    let ledger = ProgressLedger::load(&fx.ledger_path)?;
    let cancel = AtomicBool::new(false);
    let orchestrator =
        Orchestrator::new(gateway, &fx.reader, &fx.writer, &ledger, &fx.config, &cancel);
    let slugs: Vec<String> = slugs.iter().map(|s| s.to_string()).collect();
    orchestrator.run(&slugs)
}
