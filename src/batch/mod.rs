//! Batch Short-Video Maker: one generation request per title, in order.

pub mod report;
pub mod titles;

use anyhow::{Result, anyhow};
use serde_json::json;

pub use report::BatchResult;
pub use titles::{load_titles, parse_titles, select_titles};

use crate::cli::BatchArgs;
use crate::common::paths::Storage;
use crate::common::task::new_task_id;
use crate::config::AppConfig;
use crate::generator::{ApiVideoGenerator, VideoGenerator};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format, separator};
use crate::video::params::VideoParams;

pub const RESULTS_FILE: &str = "batch_results.json";

pub async fn handle_batch_command(args: &BatchArgs, config: &AppConfig) -> Result<()> {
    let titles = load_titles(&args.file)?;
    let generator = ApiVideoGenerator::from_config(&config.app)?;
    let storage = Storage::from_config(config);

    let results = run_batch(&titles, args, config, &storage, &generator).await?;

    let failed = results.iter().filter(|result| !result.success).count();
    if failed > 0 {
        return Err(anyhow!("{failed} of {} titles failed", results.len()));
    }
    Ok(())
}

/// Generate every selected title, recording failures instead of stopping.
pub async fn run_batch(
    titles: &[String],
    args: &BatchArgs,
    config: &AppConfig,
    storage: &Storage,
    generator: &dyn VideoGenerator,
) -> Result<Vec<BatchResult>> {
    let selected = select_titles(titles, args.start_index, args.max_titles);
    emit(
        Level::Info,
        "batch.start",
        &format!(
            "Generating {} of {} titles (starting at {})",
            selected.len(),
            titles.len(),
            args.start_index
        ),
        Some(json!({
            "selected": selected.len(),
            "total": titles.len(),
            "start_index": args.start_index,
        })),
    );

    let mut results = Vec::with_capacity(selected.len());
    for (offset, title) in selected.iter().enumerate() {
        let index = args.start_index + offset;
        let task_id = new_task_id();
        let task_dir = storage.task_dir(&task_id);
        let params = VideoParams::short_form(title, &config.ui);

        separator();
        emit(
            Level::Info,
            "batch.title.start",
            &format!("[{}/{}] {}", offset + 1, selected.len(), title),
            Some(json!({ "index": index, "title": title, "task_id": task_id })),
        );

        let result = match generator.generate(&task_id, &params, &task_dir).await {
            Ok(generated) => {
                let videos: Vec<String> = generated
                    .videos
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                emit(
                    Level::Success,
                    "batch.title.done",
                    &format!("Generated {} video(s) for \"{}\"", videos.len(), title),
                    Some(json!({ "task_id": task_id, "videos": videos })),
                );
                BatchResult {
                    index,
                    title: title.clone(),
                    task_id,
                    success: true,
                    videos,
                    error: None,
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                emit(
                    Level::Error,
                    "batch.title.failed",
                    &format!("\"{}\" failed: {}", title, message),
                    Some(json!({ "task_id": task_id, "error": message })),
                );
                BatchResult {
                    index,
                    title: title.clone(),
                    task_id,
                    success: false,
                    videos: Vec::new(),
                    error: Some(message),
                }
            }
        };
        results.push(result);
    }

    let results_path = storage.batch_dir().join(RESULTS_FILE);
    report::write_results(&results_path, &results)?;

    let succeeded = results.iter().filter(|result| result.success).count();
    if !results.is_empty() && matches!(get_output_format(), OutputFormat::Text) {
        println!("{}", report::summary_table(&results));
    }
    emit(
        Level::Info,
        "batch.summary",
        &format!(
            "{} succeeded, {} failed; results in {}",
            succeeded,
            results.len() - succeeded,
            results_path.display()
        ),
        Some(json!({
            "succeeded": succeeded,
            "failed": results.len() - succeeded,
            "results_file": results_path.display().to_string(),
        })),
    );

    Ok(results)
}
