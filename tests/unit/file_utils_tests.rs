/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use subnotes::file_utils::FileManager;
use crate::common;

#[test]
fn test_generate_output_path_withLectureName_shouldUseNotesStem() {
    let output = FileManager::generate_output_path(Path::new("/in/Lecture 4 - Graphs.txt"), Path::new("/out"));
    assert_eq!(output, Path::new("/out/Lecture4_Notes.md"));
}

#[test]
fn test_generate_output_path_withPlainName_shouldSanitizeStem() {
    let output = FileManager::generate_output_path(Path::new("/in/Guest talk (2021).txt"), Path::new("/out"));
    assert_eq!(output, Path::new("/out/Guest_talk_2021.md"));
}

/// Folder scans match the pattern, optionally descending into subfolders
#[test]
fn test_find_files_withPattern_shouldRespectRecursion() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("week2");
    fs::create_dir_all(&nested)?;
    common::create_test_file(temp_dir.path(), "b.txt", "b")?;
    common::create_test_file(temp_dir.path(), "a.txt", "a")?;
    common::create_test_file(temp_dir.path(), "notes.md", "skip")?;
    common::create_test_file(&nested, "c.txt", "c")?;

    let flat = FileManager::find_files(temp_dir.path(), "*.txt", false)?;
    assert_eq!(flat.len(), 2);

    let deep = FileManager::find_files(temp_dir.path(), "*.txt", true)?;
    assert_eq!(deep.len(), 3);
    Ok(())
}

#[test]
fn test_read_transcript_withInvalidUtf8_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("broken.txt");
    fs::write(&path, [0xff, 0xfe, 0xfd, b'\n'])?;
    assert!(FileManager::read_transcript(&path).is_err());
    Ok(())
}

#[test]
fn test_append_to_log_file_shouldKeepEarlierLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log = temp_dir.path().join("issues.log");

    FileManager::append_to_log_file(&log, "first")?;
    FileManager::append_to_log_file(&log, "second")?;

    let content = fs::read_to_string(&log)?;
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("first") && content.contains("second"));
    Ok(())
}
