//! Reference-image comparator.
//!
//! Each comparison ends in one of three ways:
//! 1. no reference yet: the capture is stored as the reference and the call
//!    fails with [`VisualError::ReferenceCreated`]
//! 2. reference of another size: [`VisualError::SizeMismatch`], no diff
//! 3. same size: pixel diff, pass iff mismatch ratio <= tolerance; a failing
//!    comparison writes the diff raster to the diff store

use std::fs;
use std::path::{Component, Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::diff::pixel_diff;
use super::{VisualError, VisualResult};
use crate::artifacts::sanitize_name;
use crate::config::{DEFAULT_PIXEL_THRESHOLD, VisualSettings};

/// Outcome of a comparison against an existing reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Logical screenshot name
    pub name: String,
    pub passed: bool,
    pub mismatched: u64,
    pub total: u64,
    /// Mismatched fraction
    pub ratio: f64,
    pub tolerance: f64,
    pub reference_path: PathBuf,
    /// Written only when the comparison failed
    pub diff_path: Option<PathBuf>,
}

/// Compares captures against a reference store and writes diffs
#[derive(Debug, Clone)]
pub struct VisualComparator {
    reference_dir: PathBuf,
    diff_dir: PathBuf,
    pixel_threshold: f64,
}

impl VisualComparator {
    pub fn new(reference_dir: impl Into<PathBuf>, diff_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_dir: reference_dir.into(),
            diff_dir: diff_dir.into(),
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
        }
    }

    pub fn from_settings(settings: &VisualSettings) -> Self {
        Self::new(&settings.reference_dir, &settings.diff_dir)
            .pixel_threshold(settings.pixel_threshold)
    }

    /// Per-pixel colour distance threshold (0..1)
    pub fn pixel_threshold(mut self, threshold: f64) -> Self {
        self.pixel_threshold = threshold;
        self
    }

    /// Path of the reference for a logical name.
    ///
    /// `/` in the name creates sub-directories; every component is sanitized
    /// and `.`/`..` components are dropped.
    pub fn reference_path(&self, name: &str) -> PathBuf {
        self.reference_dir.join(store_key(name))
    }

    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.diff_dir.join(store_key(name))
    }

    /// Compare PNG bytes of a fresh capture against the stored reference
    pub fn compare_capture(
        &self,
        name: &str,
        png: &[u8],
        tolerance: f64,
    ) -> VisualResult<ComparisonReport> {
        check_tolerance(tolerance)?;
        let actual = image::load_from_memory(png)?.to_rgba8();
        let reference_path = self.reference_path(name);

        if !reference_path.exists() {
            if let Some(parent) = reference_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&reference_path, png)?;
            info!(
                "created reference {} ({}x{})",
                reference_path.display(),
                actual.width(),
                actual.height()
            );
            return Err(VisualError::ReferenceCreated {
                path: reference_path,
            });
        }

        let reference = image::open(&reference_path)?.to_rgba8();
        let diff_path = self.diff_path(name);
        compare_images(
            name,
            &reference,
            &actual,
            self.pixel_threshold,
            tolerance,
            &reference_path,
            &diff_path,
        )
    }
}

/// Compare two decoded images, writing `diff_path` if they differ too much
pub fn compare_images(
    name: &str,
    reference: &RgbaImage,
    actual: &RgbaImage,
    pixel_threshold: f64,
    tolerance: f64,
    reference_path: &Path,
    diff_path: &Path,
) -> VisualResult<ComparisonReport> {
    check_tolerance(tolerance)?;

    let diff = pixel_diff(reference, actual, pixel_threshold).ok_or(VisualError::SizeMismatch {
        expected: reference.dimensions(),
        actual: actual.dimensions(),
    })?;

    let ratio = diff.ratio();
    let passed = ratio <= tolerance;
    debug!(
        screenshot = name,
        mismatched = diff.mismatched,
        total = diff.total,
        ratio,
        tolerance,
        "screenshot compared"
    );

    let diff_path = if passed {
        None
    } else {
        if let Some(parent) = diff_path.parent() {
            fs::create_dir_all(parent)?;
        }
        diff.diff_image.save(diff_path)?;
        warn!(
            "screenshot '{}' differs by {:.4} (tolerance {}), diff written to {}",
            name,
            ratio,
            tolerance,
            diff_path.display()
        );
        Some(diff_path.to_path_buf())
    };

    Ok(ComparisonReport {
        name: name.to_string(),
        passed,
        mismatched: diff.mismatched,
        total: diff.total,
        ratio,
        tolerance,
        reference_path: reference_path.to_path_buf(),
        diff_path,
    })
}

fn check_tolerance(tolerance: f64) -> VisualResult<()> {
    if (0.0..=1.0).contains(&tolerance) {
        Ok(())
    } else {
        Err(VisualError::InvalidTolerance(tolerance))
    }
}

/// Relative store path for a logical name, always ending in `.png`
fn store_key(name: &str) -> PathBuf {
    let name = name.strip_suffix(".png").unwrap_or(name);
    let mut key = PathBuf::new();
    for component in Path::new(name).components() {
        if let Component::Normal(part) = component {
            key.push(sanitize_name(&part.to_string_lossy()));
        }
    }
    if key.as_os_str().is_empty() {
        key.push("screenshot");
    }
    key.set_extension("png");
    key
}
