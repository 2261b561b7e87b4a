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

//! Ledger durability: what one run persists, the next run must see.

use std::fs;

use terjemah_hadith::ledger::{FieldRef, ProgressLedger, TargetField, TaskStatus};

#[test]
fn persisted_state_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");

    let done = FieldRef::record(1, 1, 123, TargetField::Body);
    let failed = FieldRef::record(1, 1, 124, TargetField::Title);
    let name = FieldRef::chapter_name(1, 2);

    {
        let ledger = ProgressLedger::load(&path).unwrap();
        ledger.mark_done(&done);
        ledger.mark_failed(&failed);
        ledger.mark_done(&name);
        ledger.persist().unwrap();
    }

    let reloaded = ProgressLedger::load(&path).unwrap();
    assert!(reloaded.is_done(&done));
    assert!(reloaded.is_done(&name));
    assert_eq!(reloaded.status(&failed), Some(TaskStatus::Failed));
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ProgressLedger::load(dir.path().join("progress.json")).unwrap();
    assert!(ledger.is_empty());
}

#[test]
fn attempt_counts_accumulate_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let reference = FieldRef::record(2, 5, 99, TargetField::Narrator);

    {
        let ledger = ProgressLedger::load(&path).unwrap();
        ledger.mark_failed(&reference);
        ledger.mark_failed(&reference);
        ledger.persist().unwrap();
    }

    // A third failure in a later run continues the count rather than
    // restarting it.
    let ledger = ProgressLedger::load(&path).unwrap();
    ledger.mark_failed(&reference);
    ledger.persist().unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &parsed["entries"][reference.key()];
    assert_eq!(entry["attempts"], 3);
    assert_eq!(entry["status"], "failed");
}

#[test]
fn persist_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ProgressLedger::load(dir.path().join("progress.json")).unwrap();
    ledger.mark_done(&FieldRef::chapter_name(1, 1));
    ledger.persist().unwrap();

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["progress.json".to_string()]);
}

#[test]
fn failed_refs_come_back_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ProgressLedger::load(dir.path().join("progress.json")).unwrap();

    ledger.mark_failed(&FieldRef::record(1, 2, 30, TargetField::Body));
    ledger.mark_failed(&FieldRef::record(1, 1, 10, TargetField::Body));
    ledger.mark_done(&FieldRef::record(1, 1, 11, TargetField::Body));

    let failed = ledger.failed_refs();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].chapter_id, 1);
    assert_eq!(failed[1].chapter_id, 2);
}

#[test]
fn persist_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("progress.json");
    let ledger = ProgressLedger::load(&path).unwrap();
    ledger.mark_done(&FieldRef::chapter_name(4, 4));
    ledger.persist().unwrap();
    assert!(path.exists());
}
