//! Work units and job plans.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::params::UpscaleParams;

/// One directory of images processed as a batch.
///
/// Built once by discovery and consumed once by the orchestrator.
/// The image list is never empty and is sorted by file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Absolute input directory.
    input_dir: PathBuf,
    /// Path of `input_dir` relative to the input root.
    relative_dir: PathBuf,
    /// Eligible images, sorted by file name.
    images: Vec<PathBuf>,
    /// `relative_dir` re-rooted under the output root.
    output_dir: PathBuf,
}

impl WorkUnit {
    /// Create a work unit, deriving the output directory from the output root.
    ///
    /// Images are re-sorted by file name so the dispatch order never depends
    /// on the order the caller collected them in.
    pub fn new(
        input_dir: impl Into<PathBuf>,
        relative_dir: impl Into<PathBuf>,
        mut images: Vec<PathBuf>,
        output_root: &Path,
    ) -> Self {
        let relative_dir = relative_dir.into();
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Self {
            input_dir: input_dir.into(),
            output_dir: output_root.join(&relative_dir),
            relative_dir,
            images,
        }
    }

    /// Absolute input directory.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Input directory relative to the input root.
    pub fn relative_dir(&self) -> &Path {
        &self.relative_dir
    }

    /// Output directory for this unit.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Images in dispatch order.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// Number of images in the unit.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Identifier shown in progress output (the directory name, usually the set number).
    pub fn id(&self) -> String {
        self.input_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input_dir.display().to_string())
    }

    /// Studio / model / set names inferred from the relative path.
    pub fn location(&self) -> Option<TreeLocation> {
        TreeLocation::from_relative(&self.relative_dir)
    }
}

/// Position of a set directory inside `Root/[Studio/]Model/Set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeLocation {
    /// Present only for four-level trees.
    pub studio: Option<String>,
    pub model: String,
    pub set: String,
}

impl TreeLocation {
    /// Parse a set directory path relative to the root.
    ///
    /// `Model/Set` has no studio, `Studio/Model/Set` has one. Any other
    /// depth is not a set directory.
    pub fn from_relative(relative: &Path) -> Option<Self> {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        match parts.as_slice() {
            [model, set] => Some(Self {
                studio: None,
                model: model.clone(),
                set: set.clone(),
            }),
            [studio, model, set] => Some(Self {
                studio: Some(studio.clone()),
                model: model.clone(),
                set: set.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for TreeLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.studio {
            Some(studio) => write!(f, "{} / {} / set {}", studio, self.model, self.set),
            None => write!(f, "{} / set {}", self.model, self.set),
        }
    }
}

/// Everything one orchestrator run needs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPlan {
    units: Vec<WorkUnit>,
    params: UpscaleParams,
}

impl JobPlan {
    /// Create a plan from resolved units and global parameters.
    pub fn new(units: Vec<WorkUnit>, params: UpscaleParams) -> Self {
        Self { units, params }
    }

    /// Units in processing order.
    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    /// Parameters shared by every invocation.
    pub fn params(&self) -> &UpscaleParams {
        &self.params
    }

    /// Total number of images across all units.
    pub fn total_images(&self) -> usize {
        self.units.iter().map(WorkUnit::image_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_is_rerooted() {
        let unit = WorkUnit::new(
            "/photos/Studio/Model/001",
            "Studio/Model/001",
            vec![PathBuf::from("/photos/Studio/Model/001/a.png")],
            Path::new("/out"),
        );
        assert_eq!(unit.output_dir(), Path::new("/out/Studio/Model/001"));
        assert_eq!(unit.id(), "001");
    }

    #[test]
    fn images_sorted_by_name() {
        let unit = WorkUnit::new(
            "/r/m/002",
            "m/002",
            vec![
                PathBuf::from("/r/m/002/b.jpg"),
                PathBuf::from("/r/m/002/a.png"),
                PathBuf::from("/r/m/002/C.jpeg"),
            ],
            Path::new("/o"),
        );
        let names: Vec<_> = unit
            .images()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["C.jpeg", "a.png", "b.jpg"]);
    }

    #[test]
    fn location_depends_on_depth() {
        let plain = TreeLocation::from_relative(Path::new("Model/001")).unwrap();
        assert_eq!(plain.studio, None);
        assert_eq!(plain.model, "Model");
        assert_eq!(plain.set, "001");

        let studio = TreeLocation::from_relative(Path::new("Studio/Model/001")).unwrap();
        assert_eq!(studio.studio.as_deref(), Some("Studio"));

        assert!(TreeLocation::from_relative(Path::new("Model")).is_none());
        assert!(TreeLocation::from_relative(Path::new("a/b/c/d")).is_none());
    }

    #[test]
    fn plan_counts_images() {
        let unit = |n: usize| {
            WorkUnit::new(
                "/r/m/s",
                "m/s",
                (0..n).map(|i| PathBuf::from(format!("/r/m/s/{}.png", i))).collect(),
                Path::new("/o"),
            )
        };
        let plan = JobPlan::new(vec![unit(2), unit(3)], UpscaleParams::default());
        assert_eq!(plan.total_images(), 5);
        assert_eq!(plan.units().len(), 2);
    }
}
