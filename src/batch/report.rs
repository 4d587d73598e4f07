use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

/// Outcome of one title in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub index: usize,
    pub title: String,
    pub task_id: String,
    pub success: bool,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn write_results(path: &Path, results: &[BatchResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating results directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(results).context("serializing batch results")?;
    fs::write(path, json).with_context(|| format!("writing results to {}", path.display()))
}

pub fn summary_table(results: &[BatchResult]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Title", "Task", "Status", "Output"]);

    for result in results {
        let status = if result.success {
            Cell::new("ok").fg(Color::Green)
        } else {
            Cell::new("failed").fg(Color::Red)
        };
        let detail = if result.success {
            result.videos.join("\n")
        } else {
            result.error.clone().unwrap_or_default()
        };
        table.add_row(vec![
            Cell::new(result.index + 1),
            Cell::new(&result.title),
            Cell::new(&result.task_id),
            status,
            Cell::new(detail),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<BatchResult> {
        vec![
            BatchResult {
                index: 0,
                title: "好标题".into(),
                task_id: "20250101-000000-0001".into(),
                success: true,
                videos: vec!["storage/tasks/20250101-000000-0001/final-1.mp4".into()],
                error: None,
            },
            BatchResult {
                index: 1,
                title: "Broken".into(),
                task_id: "20250101-000001-0002".into(),
                success: false,
                videos: Vec::new(),
                error: Some("video service failed: HTTP 500".into()),
            },
        ]
    }

    #[test]
    fn results_file_is_a_json_array() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("batch").join("batch_results.json");
        write_results(&path, &sample()).unwrap();

        let loaded: Vec<BatchResult> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn table_lists_every_title() {
        let rendered = summary_table(&sample()).to_string();
        assert!(rendered.contains("好标题"));
        assert!(rendered.contains("HTTP 500"));
        assert!(rendered.contains("final-1.mp4"));
    }
}
