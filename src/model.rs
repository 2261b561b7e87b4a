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

//! # Data Model Module
//!
//! Structures for both sides of the pipeline: the upstream source schema
//! (books, chapters, and hadiths as published by the hadith-json dataset)
//! and the output schema written under `hadiths/<slug>/`.
//!
//! Source structures are immutable once read. Output structures carry the
//! translated fields as `Option<String>`, serialized as `null` until the
//! pipeline fills them in, so partially translated files remain valid JSON
//! and can be resumed at field granularity.

use serde::{Deserialize, Serialize};

/// Bilingual title/author/introduction block attached to every book.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SectionMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub introduction: String,
}

/// Book-level metadata in both source languages.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub arabic: SectionMetadata,
    #[serde(default)]
    pub english: SectionMetadata,
}

/// A chapter as it appears in the upstream dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceChapter {
    pub id: i64,
    #[serde(default)]
    pub arabic: String,
    #[serde(default)]
    pub english: String,
}

impl SourceChapter {
    /// English name, falling back to the Arabic name when upstream left
    /// the English field empty.
    pub fn display_name(&self) -> &str {
        if self.english.trim().is_empty() {
            &self.arabic
        } else {
            &self.english
        }
    }
}

/// English narration text attached to a source hadith.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceHadithText {
    #[serde(default)]
    pub narrator: String,
    #[serde(default)]
    pub text: String,
}

/// A single hadith as it appears in the upstream dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceHadith {
    pub id: i64,
    #[serde(rename = "chapterId")]
    pub chapter_id: i64,
    #[serde(rename = "idInBook")]
    pub id_in_book: i64,
    #[serde(default)]
    pub arabic: String,
    #[serde(default)]
    pub english: SourceHadithText,
}

impl SourceHadith {
    /// Text the body translation is based on: English when present,
    /// otherwise the Arabic original.
    pub fn body_source(&self) -> &str {
        if self.english.text.trim().is_empty() {
            &self.arabic
        } else {
            &self.english.text
        }
    }
}

/// A complete book loaded from the source dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    /// Collection slug, e.g. "bukhari". Injected by the reader; not part
    /// of the upstream payload.
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub metadata: BookMetadata,
    pub chapters: Vec<SourceChapter>,
    pub hadiths: Vec<SourceHadith>,
}

impl Book {
    /// Hadiths belonging to the given chapter, in source order.
    pub fn hadiths_in_chapter(&self, chapter_id: i64) -> Vec<&SourceHadith> {
        self.hadiths
            .iter()
            .filter(|h| h.chapter_id == chapter_id)
            .collect()
    }
}

/// One translated hadith, with JSON keys exactly as published under
/// `hadiths/<slug>/chapter_<id>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HadithRecord {
    pub id: i64,
    pub hadith_number: i64,
    /// Brief Malay title summarizing the hadith.
    #[serde(rename = "tajuk_hadith", default)]
    pub title: Option<String>,
    /// Narrator chain rendered in Malay.
    #[serde(rename = "perawi_melayu", default)]
    pub narrator: Option<String>,
    #[serde(default)]
    pub english_text: String,
    #[serde(default)]
    pub arabic_text: String,
    #[serde(default)]
    pub malay_translation: Option<String>,
}

impl HadithRecord {
    /// Builds an untranslated output record from a source hadith.
    pub fn from_source(source: &SourceHadith) -> Self {
        HadithRecord {
            id: source.id,
            hadith_number: source.id_in_book,
            title: None,
            narrator: None,
            english_text: source.english.text.clone(),
            arabic_text: source.arabic.clone(),
            malay_translation: None,
        }
    }

    /// Carries over already-translated fields from a previously written
    /// record. Source-side fields always come from the fresh read.
    pub fn merge_existing(&mut self, existing: &HadithRecord) {
        if self.title.is_none() {
            self.title = existing.title.clone();
        }
        if self.narrator.is_none() {
            self.narrator = existing.narrator.clone();
        }
        if self.malay_translation.is_none() {
            self.malay_translation = existing.malay_translation.clone();
        }
    }
}

/// Chapter entry in `chapter_names.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChapterName {
    pub id: i64,
    pub english: String,
    #[serde(default)]
    pub malay: Option<String>,
}

/// The `chapter_names.json` document: book id, bilingual metadata, and the
/// chapter list with Malay names filled in as translation progresses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChapterNamesFile {
    pub id: i64,
    pub metadata: BookMetadata,
    pub chapters: Vec<ChapterName>,
}

impl ChapterNamesFile {
    /// Builds the chapter list for a book with no Malay names yet.
    pub fn from_book(book: &Book) -> Self {
        ChapterNamesFile {
            id: book.id,
            metadata: book.metadata.clone(),
            chapters: book
                .chapters
                .iter()
                .map(|c| ChapterName {
                    id: c.id,
                    english: c.display_name().to_string(),
                    malay: None,
                })
                .collect(),
        }
    }

    /// Carries over already-translated Malay names from a previous run.
    pub fn merge_existing(&mut self, existing: &ChapterNamesFile) {
        for chapter in &mut self.chapters {
            if chapter.malay.is_some() {
                continue;
            }
            if let Some(prior) = existing.chapters.iter().find(|c| c.id == chapter.id) {
                chapter.malay = prior.malay.clone();
            }
        }
    }
}
