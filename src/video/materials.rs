use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use super::ffmpeg::MediaProbe;
use crate::error::MakerError;
use crate::ui::prelude::{Level, emit};

const MATERIAL_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];
const MIN_MATERIAL_SIDE: u32 = 480;

/// A local video file that passed probing.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub path: PathBuf,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

pub fn is_material_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MATERIAL_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Candidate files in `dir`, sorted by name.
pub fn list_material_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MakerError::MissingInput(format!(
            "materials directory {} does not exist",
            dir.display()
        ))
        .into());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("reading materials directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_material_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Probe every candidate and keep the usable ones.
pub fn collect_materials(dir: &Path, probe: &dyn MediaProbe) -> Result<Vec<Material>> {
    let mut materials = Vec::new();

    for path in list_material_files(dir)? {
        let (width, height) = match probe.dimensions(&path) {
            Ok(dims) => dims,
            Err(err) => {
                emit(
                    Level::Warn,
                    "video.materials.unreadable",
                    &format!("Skipping {}: {err:#}", path.display()),
                    None,
                );
                continue;
            }
        };

        if width < MIN_MATERIAL_SIDE || height < MIN_MATERIAL_SIDE {
            emit(
                Level::Warn,
                "video.materials.too_small",
                &format!(
                    "Skipping {} ({}x{} is below {}x{})",
                    path.display(),
                    width,
                    height,
                    MIN_MATERIAL_SIDE,
                    MIN_MATERIAL_SIDE
                ),
                Some(json!({ "path": path.display().to_string(), "width": width, "height": height })),
            );
            continue;
        }

        let duration = match probe.duration_seconds(&path) {
            Ok(duration) if duration > 0.0 => duration,
            Ok(_) => {
                emit(
                    Level::Warn,
                    "video.materials.empty",
                    &format!("Skipping {}: zero duration", path.display()),
                    None,
                );
                continue;
            }
            Err(err) => {
                emit(
                    Level::Warn,
                    "video.materials.unreadable",
                    &format!("Skipping {}: {err:#}", path.display()),
                    None,
                );
                continue;
            }
        };

        materials.push(Material {
            path,
            duration,
            width,
            height,
        });
    }

    if materials.is_empty() {
        return Err(MakerError::MissingInput(format!(
            "no usable video materials in {}",
            dir.display()
        ))
        .into());
    }

    emit(
        Level::Info,
        "video.materials.collected",
        &format!("Found {} usable materials", materials.len()),
        Some(json!({ "count": materials.len() })),
    );

    Ok(materials)
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeProbe;
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"video").unwrap();
    }

    #[test]
    fn lists_known_extensions_sorted() {
        let temp = tempdir().unwrap();
        for name in ["b.MOV", "a.mp4", "notes.txt", "c.mkv", "d.avi"] {
            touch(temp.path(), name);
        }
        let files = list_material_files(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV", "c.mkv", "d.avi"]);
    }

    #[test]
    fn small_and_unreadable_materials_are_skipped() {
        let temp = tempdir().unwrap();
        for name in ["big.mp4", "small.mp4", "broken.mp4"] {
            touch(temp.path(), name);
        }
        let probe = FakeProbe::default()
            .with("big.mp4", (1920, 1080), 30.0)
            .with("small.mp4", (320, 240), 30.0);

        let materials = collect_materials(temp.path(), &probe).unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].path, temp.path().join("big.mp4"));
        assert_eq!(materials[0].duration, 30.0);
    }

    #[test]
    fn empty_directory_is_missing_input() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "readme.md");
        let err = collect_materials(temp.path(), &FakeProbe::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::MissingInput(_))
        ));
    }

    #[test]
    fn missing_directory_is_missing_input() {
        let temp = tempdir().unwrap();
        let err = list_material_files(&temp.path().join("nope")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MakerError>(),
            Some(MakerError::MissingInput(_))
        ));
    }
}
