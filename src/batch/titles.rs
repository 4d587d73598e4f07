use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::MakerError;

/// Trimmed, non-blank lines in file order.
pub fn parse_titles(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_titles(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(MakerError::FileNotFound(path.to_path_buf()).into());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading titles from {}", path.display()))?;
    Ok(parse_titles(&contents))
}

/// Skip `start_index` titles, then keep at most `max_titles`.
pub fn select_titles(titles: &[String], start_index: usize, max_titles: Option<usize>) -> &[String] {
    let start = start_index.min(titles.len());
    let end = match max_titles {
        Some(max) => start.saturating_add(max).min(titles.len()),
        None => titles.len(),
    };
    &titles[start..end]
}
