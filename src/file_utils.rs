use anyhow::{anyhow, Context, Result};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

static LECTURE_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)lecture\s*(\d+)").unwrap()
});

static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[\](){}]").unwrap()
});

static SPECIAL_CHAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\s-]").unwrap()
});

static WHITESPACE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").unwrap()
});

const MAX_STEM_CHARS: usize = 50;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files whose name matches a glob-style pattern (`*`, `?`), sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
        let matcher = Self::pattern_to_regex(pattern)?;
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true).max_depth(max_depth) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                let name = entry.file_name().to_string_lossy();
                if matcher.is_match(&name) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    // @converts: `*.txt` style pattern to an anchored, case-insensitive regex
    fn pattern_to_regex(pattern: &str) -> Result<Regex> {
        let mut expression = String::from("(?i)^");
        for c in pattern.chars() {
            match c {
                '*' => expression.push_str(".*"),
                '?' => expression.push('.'),
                other => expression.push_str(&regex::escape(&other.to_string())),
            }
        }
        expression.push('$');
        Regex::new(&expression).map_err(|e| anyhow!("Invalid file pattern '{}': {}", pattern, e))
    }

    /// Read a UTF-8 transcript, dropping a leading byte-order mark
    pub fn read_transcript<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| anyhow!("File is not valid UTF-8: {:?} ({})", path, e.utf8_error()))?;

        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Output stem for a transcript: `Lecture<n>_Notes`, or the sanitized input stem
    pub fn clean_output_stem(stem: &str) -> String {
        if let Some(captures) = LECTURE_NUMBER_REGEX.captures(stem) {
            return format!("Lecture{}_Notes", &captures[1]);
        }

        let clean = BRACKET_REGEX.replace_all(stem, "");
        let clean = SPECIAL_CHAR_REGEX.replace_all(&clean, "");
        let clean = WHITESPACE_RUN_REGEX.replace_all(clean.trim(), "_");
        let mut clean = clean.replace("__", "_").trim_matches('_').to_string();

        if clean.chars().count() > MAX_STEM_CHARS {
            clean = clean.chars().take(MAX_STEM_CHARS).collect::<String>();
            clean = clean.trim_end_matches('_').to_string();
        }

        if clean.is_empty() {
            "processed_file".to_string()
        } else {
            clean
        }
    }

    // @generates: Markdown output path for a transcript
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(input_file: P1, output_dir: P2) -> PathBuf {
        let stem = input_file
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        output_dir
            .as_ref()
            .join(format!("{}.md", Self::clean_output_stem(&stem)))
    }
}
