use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::MakerError;

pub const SCRIPT_FILE: &str = "script.txt";
pub const MAX_SEGMENT_CHARS: usize = 1000;
const SENTENCE_END: char = '。';

/// Read `<task_path>/script.txt`; absent or blank scripts are missing input.
pub fn read_script(task_path: &Path) -> Result<String> {
    let path = task_path.join(SCRIPT_FILE);
    if !path.is_file() {
        return Err(MakerError::MissingInput(format!(
            "{} not found in task directory {}",
            SCRIPT_FILE,
            task_path.display()
        ))
        .into());
    }

    let script = fs::read_to_string(&path)
        .with_context(|| format!("reading script from {}", path.display()))?;
    let script = script.trim().to_string();
    if script.is_empty() {
        return Err(MakerError::MissingInput(format!("{} is empty", path.display())).into());
    }
    Ok(script)
}

/// Group sentences into segments of at most `max_chars` characters.
///
/// Sentences end at `。` and keep it; a sentence longer than the limit
/// becomes a segment of its own.
pub fn split_script(script: &str, max_chars: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in script.split(SENTENCE_END) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence = format!("{sentence}{SENTENCE_END}");
        let len = sentence.chars().count();

        if current_len + len > max_chars && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(&sentence);
        current_len += len;
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn short_script_is_one_segment() {
        assert_eq!(split_script("第一句。第二句。", 1000), vec!["第一句。第二句。"]);
    }

    #[test]
    fn sentences_are_grouped_under_the_limit() {
        let segments = split_script("一二三。四五六。七八九。", 8);
        assert_eq!(segments, vec!["一二三。四五六。", "七八九。"]);
        assert!(segments.iter().all(|s| s.chars().count() <= 8));
    }

    #[test]
    fn oversized_sentence_stands_alone() {
        let long = "长".repeat(20);
        let script = format!("短。{long}。尾。");
        let segments = split_script(&script, 10);
        assert_eq!(segments, vec!["短。".to_string(), format!("{long}。"), "尾。".to_string()]);
    }

    #[test]
    fn trailing_text_without_terminator_is_kept() {
        assert_eq!(split_script("开头。 结尾没有句号", 1000), vec!["开头。结尾没有句号。"]);
    }

    #[test]
    fn missing_script_is_missing_input() {
        let temp = tempdir().unwrap();
        let err = read_script(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::MissingInput(_))
        ));
    }

    #[test]
    fn blank_script_is_missing_input() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(SCRIPT_FILE), " \n\t").unwrap();
        assert!(read_script(temp.path()).is_err());
    }
}
