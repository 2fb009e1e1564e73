/*!
 * Transcript and bilingual document model.
 *
 * A `Document` holds one section per chunk, in chunk-index order. Each section
 * pairs source paragraphs with their translations; rendering interleaves them
 * so every English paragraph is immediately followed by its translation.
 */

use serde::Serialize;
use std::fmt::Write as _;

use crate::language_utils;

/// Text shown in place of a translation that failed
pub const FAILED_TRANSLATION_PLACEHOLDER: &str = "[Translation failed]";

/// Text shown for chunks that never finished because the run was cancelled
pub const ABANDONED_TRANSLATION_PLACEHOLDER: &str = "[Translation not completed: run cancelled]";

/// An input transcript; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    source_id: String,
    text: String,
    language: String,
}

impl Transcript {
    /// Create a transcript in the default source language (`en`)
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_language(source_id, text, "en")
    }

    pub fn with_language(source_id: impl Into<String>, text: impl Into<String>, language: impl Into<String>) -> Self {
        let text = text.into();
        let text = match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        };
        Self {
            source_id: source_id.into(),
            text,
            language: language.into(),
        }
    }

    /// Path or URL the text came from
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

/// A source paragraph and its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParagraphPair {
    pub source: String,
    pub translated: String,
}

/// How a section's chunk ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SectionOutcome {
    Translated,
    Failed { error: String },
    /// The run stopped before the chunk finished
    Abandoned,
}

/// Document section built from one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub chunk_index: usize,
    pub pairs: Vec<ParagraphPair>,
    pub outcome: SectionOutcome,
}

impl Section {
    pub fn is_translated(&self) -> bool {
        self.outcome == SectionOutcome::Translated
    }
}

/// Rendering switches
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Prepend YAML front matter (title, publish date, language)
    pub front_matter: bool,
    /// Overrides the document's own title
    pub title: Option<String>,
}

/// Bilingual study notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub source_language: String,
    pub target_language: String,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: impl Into<String>, source_language: &str, target_language: &str) -> Self {
        Self {
            title: title.into(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            sections: Vec::new(),
        }
    }

    /// All paragraph pairs in document order
    pub fn pairs(&self) -> impl Iterator<Item = &ParagraphPair> {
        self.sections.iter().flat_map(|section| section.pairs.iter())
    }

    /// Chunk indices of failed sections
    pub fn failed_sections(&self) -> Vec<usize> {
        self.sections
            .iter()
            .filter(|section| matches!(section.outcome, SectionOutcome::Failed { .. }))
            .map(|section| section.chunk_index)
            .collect()
    }

    /// Render as Markdown
    pub fn render(&self, options: &RenderOptions) -> String {
        let title = options.title.as_deref().unwrap_or(&self.title);
        let mut output = String::new();

        if options.front_matter {
            let language = language_utils::short_code(&self.target_language)
                .unwrap_or_else(|_| self.target_language.clone());
            let _ = writeln!(output, "---");
            let _ = writeln!(output, "title: \"{}\"", title.replace('"', "\\\""));
            let _ = writeln!(output, "publishDate: {}", chrono::Local::now().format("%Y-%m-%d"));
            let _ = writeln!(output, "language: {}", language);
            let _ = writeln!(output, "---");
            output.push('\n');
        }

        let _ = writeln!(output, "# {}", title);

        for pair in self.pairs() {
            output.push('\n');
            let _ = writeln!(output, "{}", pair.source);
            output.push('\n');
            let _ = writeln!(output, "{}", pair.translated);
        }

        output
    }
}
