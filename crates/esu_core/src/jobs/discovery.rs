//! Work unit discovery from the input tree.
//!
//! Scans `Root/[Studio/]Model/Set` once and snapshots what exists. Nothing
//! here creates directories; output directories are created by the
//! orchestrator right before the first image of a unit is dispatched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::selector::SetSelector;
use crate::models::WorkUnit;

/// Recognized image extensions (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Errors raised while scanning the input tree.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The model directory is missing or is not a directory.
    #[error("{0} is not a valid model directory")]
    InvalidModelDirectory(PathBuf),

    /// A scanned path does not live under the input root.
    #[error("{path} is not inside root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Reading a directory failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiscoveryError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// True if the path has one of the [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// List eligible images directly inside `dir`, sorted by file name.
///
/// Only regular files count; subdirectories are never descended into.
pub fn list_images(dir: &Path) -> DiscoveryResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| DiscoveryError::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DiscoveryError::io(dir, e))?.path();
        if path.is_file() && has_image_extension(&path) {
            images.push(path);
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Resolve the work units of a model directory.
///
/// * empty selector: the model directory itself is the only unit (flat mode)
/// * `All`: every subdirectory with images, in directory-name order
/// * explicit ids: matching subdirectories in selector order; missing ones
///   are skipped
///
/// Directories without eligible images never become units.
///
/// # Arguments
/// * `root` - Input root; relative paths and output layout derive from it
/// * `model_dir` - Model directory, absolute or relative to `root`
/// * `selector` - Resolved set selection
/// * `output_root` - Root the relative layout is mirrored under
pub fn discover_work_units(
    root: &Path,
    model_dir: &Path,
    selector: &SetSelector,
    output_root: &Path,
) -> DiscoveryResult<Vec<WorkUnit>> {
    let model_dir = root.join(model_dir);
    if !model_dir.is_dir() {
        return Err(DiscoveryError::InvalidModelDirectory(model_dir));
    }

    let candidates: Vec<PathBuf> = match selector {
        SetSelector::Sets(ids) if ids.is_empty() => vec![model_dir.clone()],
        SetSelector::All => {
            let entries = fs::read_dir(&model_dir).map_err(|e| DiscoveryError::io(&model_dir, e))?;
            let mut dirs = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| DiscoveryError::io(&model_dir, e))?.path();
                if path.is_dir() {
                    dirs.push(path);
                }
            }
            dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            dirs
        }
        SetSelector::Sets(ids) => ids
            .iter()
            .map(|id| model_dir.join(id))
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    tracing::debug!("Set directory {} does not exist, skipping", dir.display());
                }
                exists
            })
            .collect(),
    };

    let mut units = Vec::with_capacity(candidates.len());
    for dir in candidates {
        let images = list_images(&dir)?;
        if images.is_empty() {
            tracing::debug!("No images in {}, skipping", dir.display());
            continue;
        }
        let relative = relative_to_root(root, &dir)?;
        units.push(WorkUnit::new(dir, relative, images, output_root));
    }

    tracing::info!(
        "Discovered {} work unit(s) under {}",
        units.len(),
        model_dir.display()
    );

    Ok(units)
}

/// Group individually named images into work units by parent directory.
///
/// Files are relative to `root` (absolute paths are accepted as long as
/// they are inside it). Missing files and non-images are skipped with a
/// warning. Units follow the first appearance of each parent directory.
pub fn discover_file_units(
    root: &Path,
    files: &[PathBuf],
    output_root: &Path,
) -> DiscoveryResult<Vec<WorkUnit>> {
    let mut groups: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();

    for file in files {
        let path = root.join(file);
        if !path.is_file() || !has_image_extension(&path) {
            tracing::warn!("Skipping {}: not an image file", path.display());
            continue;
        }
        let parent = path.parent().unwrap_or(root).to_path_buf();

        match groups.iter_mut().find(|(dir, _)| *dir == parent) {
            Some((_, images)) => {
                if !images.contains(&path) {
                    images.push(path);
                }
            }
            None => groups.push((parent, vec![path])),
        }
    }

    groups
        .into_iter()
        .map(|(dir, images)| {
            let relative = relative_to_root(root, &dir)?;
            Ok(WorkUnit::new(dir, relative, images, output_root))
        })
        .collect()
}

fn relative_to_root(root: &Path, path: &Path) -> DiscoveryResult<PathBuf> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| DiscoveryError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
}
