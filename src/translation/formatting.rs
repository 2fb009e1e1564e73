/*!
 * Cleanup of model output and paragraph handling.
 *
 * Models sometimes wrap the translation in code fences, echo format labels
 * such as `[Chinese translation]`, or pad it with runs of empty lines. The
 * cleanup here strips those artifacts before the text reaches a document.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Code fence lines, with or without a language tag
static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[\w-]*[ \t]*\r?\n?").unwrap()
});

/// A whole line that is only a bracketed label, e.g. `[Translation]` or `【中文翻译】`
static LABEL_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t]*(\[[^\]\n]{0,40}(translation|paragraph|english|chinese|译文|翻译|段落)[^\]\n]{0,40}\]|【[^】\n]{0,40}】)[ \t]*:?[ \t]*$").unwrap()
});

/// Incomplete-sentence markers some prompts provoke
static INCOMPLETE_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(incomplete sentence|不完整句子)[^\]]*\]").unwrap()
});

/// Bracketed blocks too long to be genuine content
static LONG_BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]{100,}\]").unwrap()
});

static EXCESS_NEWLINES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").unwrap()
});

/// Blank line separating paragraphs, whitespace-only lines included
static PARAGRAPH_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t\r]*\n").unwrap()
});

static INLINE_WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").unwrap()
});

/// Clean a raw model answer; an empty result means the answer carried no translation
pub fn clean_model_output(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = CODE_FENCE_REGEX.replace_all(&text, "");
    let text = LABEL_LINE_REGEX.replace_all(&text, "");
    let text = INCOMPLETE_MARKER_REGEX.replace_all(&text, "");
    let text = LONG_BRACKET_REGEX.replace_all(&text, "");
    let text = normalize_blank_lines(&text);
    text.trim().to_string()
}

/// Collapse whitespace-only lines and runs of blank lines into single paragraph breaks
pub fn normalize_blank_lines(text: &str) -> String {
    let text = PARAGRAPH_BREAK_REGEX.replace_all(text, "\n\n");
    // A second pass catches breaks that shared a newline with the first match
    let text = PARAGRAPH_BREAK_REGEX.replace_all(&text, "\n\n");
    EXCESS_NEWLINES_REGEX.replace_all(&text, "\n\n").into_owned()
}

/// Split text into paragraphs on blank lines; each paragraph's lines are joined by single spaces
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK_REGEX
        .split(&text.replace("\r\n", "\n"))
        .map(|paragraph| INLINE_WHITESPACE_REGEX.replace_all(paragraph.trim(), " ").into_owned())
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Split translated text into paragraphs, keeping the model's own line breaks
pub fn split_translated_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK_REGEX
        .split(text)
        .map(|paragraph| paragraph.trim().to_string())
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}
