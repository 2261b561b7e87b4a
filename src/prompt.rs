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

//! # Prompt Module
//!
//! Context-specific prompt templates for Malay (Malaysia) translation,
//! plus the token estimate used to enforce the gateway's input ceiling.
//!
//! All templates instruct the model to preserve the religious register:
//! technical Islamic terms (Sahih, Hadith, names of prophets and
//! companions) stay in their original form when no equivalent Malay term
//! exists or the original is the culturally preferred usage.

use serde::{Deserialize, Serialize};

const CHARS_PER_ARABIC_TOKEN: f64 = 0.6;
const CHARS_PER_LATIN_TOKEN: f64 = 1.3;

/// Estimates the provider token count of a text. Arabic script tokenizes
/// far denser than Latin script, so the two are weighted separately.
pub fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    let arabic_chars = text
        .chars()
        .filter(|c| ('\u{0600}'..='\u{06ff}').contains(c) || ('\u{0750}'..='\u{077f}').contains(c))
        .count();
    let latin_words = word_count.saturating_sub(arabic_chars / 2);
    let estimated = (arabic_chars as f64 * CHARS_PER_ARABIC_TOKEN
        + latin_words as f64 * CHARS_PER_LATIN_TOKEN)
        .ceil() as usize;
    estimated.max(1)
}

/// What kind of text a translation request carries. Each variant selects
/// its own prompt template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptContext {
    /// Generate a brief Malay title summarizing a hadith.
    Title,
    /// Translate a chapter name.
    ChapterName,
    /// Translate the body of a hadith.
    HadithBody,
    /// Translate a narrator chain.
    Narrator,
}

impl PromptContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptContext::Title => "title",
            PromptContext::ChapterName => "chapter_name",
            PromptContext::HadithBody => "hadith_body",
            PromptContext::Narrator => "narrator",
        }
    }
}

const PREAMBLE: &str = "You are a highly skilled translator specializing in Islamic texts. \
Your task is to translate Hadith material from English to Malay (Malaysia), ensuring accuracy, \
cultural sensitivity, and preservation of the original message's religious and spiritual meaning. \
Use standard Malay spelling and grammar, and maintain consistency in terminology. \
Retain technical Islamic terms (e.g. Sahih, Hadith, names of prophets and companions) in their \
original form if a direct, equivalent Malay term does not exist or if using the original term is \
culturally preferred and understood by Malay speakers. \
The input may contain Arabic Unicode characters; handle them correctly and preserve non-ASCII \
characters in your output.";

/// Renders the full prompt for a translation request.
pub fn render(context: PromptContext, text: &str) -> String {
    match context {
        PromptContext::Title => format!(
            "{PREAMBLE}\n\n\
             Create a brief, meaningful title in Malay (Malaysia) that accurately summarizes \
             the essence of the following Hadith. Return only the title, with no surrounding \
             quotes or commentary.\n\nHadith: {text}"
        ),
        PromptContext::ChapterName => format!(
            "{PREAMBLE}\n\n\
             Translate the following chapter name into accurate and fluent Malay (Malaysia), \
             preserving its religious and spiritual meaning. Return only the translated \
             chapter name.\n\nChapter Name: {text}"
        ),
        PromptContext::HadithBody => format!(
            "{PREAMBLE}\n\n\
             Translate the following Hadith text into accurate and fluent Malay (Malaysia). \
             Demonstrate a deep understanding of Islamic context; consider cultural nuances \
             and avoid literal translations that may distort the intended meaning. Return \
             only the translation.\n\nText: {text}"
        ),
        PromptContext::Narrator => format!(
            "{PREAMBLE}\n\n\
             Translate the following narrator chain into Malay (Malaysia), keeping the names \
             of narrators in their original form. Return only the translated narration \
             line.\n\nNarrator: {text}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_scale_with_length() {
        let short = estimate_tokens("The best charity");
        let long = estimate_tokens(&"The best charity is that given in Ramadan. ".repeat(50));
        assert!(long > short);
    }

    #[test]
    fn arabic_counts_denser_than_latin() {
        // Same character count, Arabic should estimate fewer chars per token.
        let arabic = estimate_tokens("خير الصدقة ما كان عن ظهر غنى");
        assert!(arabic >= 1);
    }

    #[test]
    fn empty_text_estimates_at_least_one() {
        assert_eq!(estimate_tokens(""), 1);
    }

    #[test]
    fn each_context_embeds_its_text() {
        for context in [
            PromptContext::Title,
            PromptContext::ChapterName,
            PromptContext::HadithBody,
            PromptContext::Narrator,
        ] {
            let prompt = render(context, "SAMPLE-INPUT");
            assert!(prompt.contains("SAMPLE-INPUT"));
            assert!(prompt.contains("Malay (Malaysia)"));
        }
    }
}
