/*!
 * Prompt templates for chunk translation.
 *
 * The system prompt comes from configuration and may use the
 * `{source_language}` and `{target_language}` placeholders. The user prompt
 * carries the fixed output rules and the chunk itself.
 */

/// Output rules sent with every chunk
const CHUNK_INSTRUCTIONS: &str = r#"Translate the transcript excerpt below from {source_language} to {target_language}.

## Output Requirements
- Translate paragraph by paragraph. Paragraphs in the excerpt are separated by blank lines; an excerpt without blank lines is a single paragraph
- Return exactly one translated paragraph per source paragraph, in the same order, separated by one blank line
- Correct obvious speech-recognition mistakes silently while translating
- Translate an unfinished trailing sentence as it stands; never complete it
- Return ONLY the translation: no headings, labels, numbering, notes or the original text

## Transcript Excerpt
{chunk}"#;

/// System prompt template with language placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template with the given language names
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

/// A fully rendered request, independent of any provider wire format
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPrompt {
    pub system: String,
    pub user: String,
    /// The chunk text wrapped by `user`
    pub source_text: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Builds prompts for one language pair
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    system: String,
    source_language: String,
    target_language: String,
    temperature: f32,
    max_tokens: u32,
}

impl TranslationPromptBuilder {
    /// Languages are display names ("English", "Chinese"), not codes
    pub fn new(template: &PromptTemplate, source_language: &str, target_language: &str) -> Self {
        Self {
            system: template.render(source_language, target_language),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            temperature: 0.1,
            max_tokens: 3500,
        }
    }

    /// Temperature is clamped to the 0–1 range
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = if temperature.is_nan() { 0.0 } else { temperature.clamp(0.0, 1.0) };
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn build(&self, chunk: &str) -> TranslationPrompt {
        let user = CHUNK_INSTRUCTIONS
            .replace("{source_language}", &self.source_language)
            .replace("{target_language}", &self.target_language)
            .replace("{chunk}", chunk.trim_end());

        TranslationPrompt {
            system: self.system.clone(),
            user,
            source_text: chunk.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
