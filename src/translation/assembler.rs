/*!
 * Reassembly of chunk results into a bilingual document.
 *
 * Section order comes solely from chunk indices, never from completion order.
 */

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::PipelineError;
use crate::translation::chunk::{Chunk, ChunkResult};
use crate::translation::document::{
    Document, ParagraphPair, Section, SectionOutcome, ABANDONED_TRANSLATION_PLACEHOLDER,
    FAILED_TRANSLATION_PLACEHOLDER,
};
use crate::translation::formatting::{split_paragraphs, split_translated_paragraphs};
use crate::translation::segmenter::paragraph_texts;

/// Builds documents for one title and language pair
#[derive(Debug, Clone)]
pub struct Assembler {
    title: String,
    source_language: String,
    target_language: String,
}

impl Assembler {
    pub fn new(title: impl Into<String>, source_language: &str, target_language: &str) -> Self {
        Self {
            title: title.into(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }

    /// Assemble a finished run; every chunk needs exactly one terminal result
    pub fn assemble(&self, chunks: &[Chunk], results: &BTreeMap<usize, ChunkResult>) -> Result<Document, PipelineError> {
        let (missing, unexpected) = Self::index_mismatch(chunks, results);
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(PipelineError::InternalConsistency { missing, unexpected });
        }

        let mut document = self.empty_document();
        for chunk in Self::in_index_order(chunks) {
            // Presence was checked above
            if let Some(result) = results.get(&chunk.index()) {
                document.sections.push(Self::section_for(chunk, result));
            }
        }

        debug!(
            "Assembled {} sections ({} failed)",
            document.sections.len(),
            document.failed_sections().len()
        );
        Ok(document)
    }

    /// Best-effort document for a cancelled run; chunks without a result are marked abandoned
    pub fn assemble_cancelled(&self, chunks: &[Chunk], results: &BTreeMap<usize, ChunkResult>) -> Document {
        let mut document = self.empty_document();
        let mut abandoned = 0;

        for chunk in Self::in_index_order(chunks) {
            let section = match results.get(&chunk.index()) {
                Some(result) => Self::section_for(chunk, result),
                None => {
                    abandoned += 1;
                    Self::whole_chunk_section(chunk, ABANDONED_TRANSLATION_PLACEHOLDER, SectionOutcome::Abandoned)
                }
            };
            document.sections.push(section);
        }

        if abandoned > 0 {
            warn!("{} of {} chunks abandoned by cancellation", abandoned, chunks.len());
        }
        document
    }

    fn empty_document(&self) -> Document {
        Document::new(self.title.clone(), &self.source_language, &self.target_language)
    }

    fn in_index_order(chunks: &[Chunk]) -> Vec<&Chunk> {
        let mut ordered: Vec<&Chunk> = chunks.iter().collect();
        ordered.sort_by_key(|chunk| chunk.index());
        ordered
    }

    /// Indices `0..chunks.len()` lacking a result, and result keys that match no chunk
    fn index_mismatch(chunks: &[Chunk], results: &BTreeMap<usize, ChunkResult>) -> (Vec<usize>, Vec<usize>) {
        let total = chunks.len();
        let chunk_indices: BTreeSet<usize> = chunks.iter().map(Chunk::index).collect();

        let missing: BTreeSet<usize> = (0..total)
            .chain(chunk_indices.iter().copied())
            .filter(|index| !results.contains_key(index))
            .collect();

        let unexpected = results
            .keys()
            .copied()
            .filter(|index| *index >= total || !chunk_indices.contains(index))
            .collect();

        (missing.into_iter().collect(), unexpected)
    }

    fn section_for(chunk: &Chunk, result: &ChunkResult) -> Section {
        match &result.outcome {
            Ok(translated) => Section {
                chunk_index: chunk.index(),
                pairs: Self::pair_paragraphs(chunk.source(), translated),
                outcome: SectionOutcome::Translated,
            },
            Err(error) => Self::whole_chunk_section(
                chunk,
                FAILED_TRANSLATION_PLACEHOLDER,
                SectionOutcome::Failed {
                    error: error.to_string(),
                },
            ),
        }
    }

    fn whole_chunk_section(chunk: &Chunk, placeholder: &str, outcome: SectionOutcome) -> Section {
        let source = split_paragraphs(chunk.source()).join("\n\n");
        let pairs = if source.is_empty() {
            Vec::new()
        } else {
            vec![ParagraphPair {
                source,
                translated: placeholder.to_string(),
            }]
        };
        Section {
            chunk_index: chunk.index(),
            pairs,
            outcome,
        }
    }

    /// Pair paragraphs 1:1 when the counts agree, else keep the chunk as one pair.
    ///
    /// A source whose sentence-ended lines form more paragraphs than its blank
    /// lines do is paired on those segmentation boundaries first, against
    /// translated paragraphs or translated lines. Blank-line paragraphs come next.
    pub fn pair_paragraphs(source: &str, translated: &str) -> Vec<ParagraphPair> {
        let sources = split_paragraphs(source);
        let translations = split_translated_paragraphs(translated);

        if sources.is_empty() && translations.is_empty() {
            return Vec::new();
        }

        let sentences = paragraph_texts(source);
        if sentences.len() > sources.len() {
            if sentences.len() == translations.len() {
                return Self::zip_pairs(sentences, translations);
            }
            let lines: Vec<String> = translated
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if sentences.len() == lines.len() {
                return Self::zip_pairs(sentences, lines);
            }
        }

        if sources.len() == translations.len() {
            return Self::zip_pairs(sources, translations);
        }

        debug!(
            "Paragraph count mismatch ({} source, {} translated), keeping chunk whole",
            sources.len(),
            translations.len()
        );
        vec![ParagraphPair {
            source: sources.join("\n\n"),
            translated: translations.join("\n\n"),
        }]
    }

    fn zip_pairs(sources: Vec<String>, translations: Vec<String>) -> Vec<ParagraphPair> {
        sources
            .into_iter()
            .zip(translations)
            .map(|(source, translated)| ParagraphPair { source, translated })
            .collect()
    }
}
