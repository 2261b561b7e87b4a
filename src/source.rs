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

//! # Source Reader Module
//!
//! Loads raw book records from the upstream hadith-json dataset, either
//! from a local directory of `<slug>.json` files or fetched over HTTP from
//! the upstream repository. Reading has no side effects; the dataset is an
//! immutable input feed.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TerjemahError};
use crate::model::Book;

/// Where book files come from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    /// Local directory containing `<slug>.json` files.
    Dir(PathBuf),
    /// HTTP base URL; books are fetched as `<base>/<slug>.json`.
    Url(String),
}

impl SourceLocation {
    /// Interprets a CLI argument: anything that looks like an HTTP URL is
    /// remote, everything else is a local directory.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            SourceLocation::Url(value.trim_end_matches('/').to_string())
        } else {
            SourceLocation::Dir(PathBuf::from(value))
        }
    }
}

/// Reader over the upstream dataset.
pub struct SourceReader {
    location: SourceLocation,
    client: reqwest::blocking::Client,
}

impl SourceReader {
    pub fn new(location: SourceLocation) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TerjemahError::Io(format!("failed to build HTTP client: {e}")))?;
        Ok(SourceReader { location, client })
    }

    /// Loads a complete book (chapters and hadiths populated, Malay fields
    /// absent). `NotFound` when the dataset lacks the book, `MalformedData`
    /// when the payload does not match the upstream schema.
    pub fn read_book(&self, slug: &str) -> Result<Book> {
        let raw = match &self.location {
            SourceLocation::Dir(root) => {
                let path = root.join(format!("{slug}.json"));
                if !path.exists() {
                    return Err(TerjemahError::not_found(slug));
                }
                fs::read_to_string(&path)?
            }
            SourceLocation::Url(base) => self.fetch_remote(base, slug)?,
        };

        let mut book: Book = serde_json::from_str(&raw)
            .map_err(|e| TerjemahError::malformed(slug, e.to_string()))?;
        book.slug = slug.to_string();
        Ok(book)
    }

    fn fetch_remote(&self, base: &str, slug: &str) -> Result<String> {
        let url = format!("{base}/{slug}.json");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TerjemahError::Io(format!("failed to fetch {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TerjemahError::not_found(slug));
        }
        if !response.status().is_success() {
            return Err(TerjemahError::Io(format!(
                "fetching {url} returned {}",
                response.status()
            )));
        }
        response
            .text()
            .map_err(|e| TerjemahError::Io(format!("failed to read body of {url}: {e}")))
    }
}
