//! Visual regression checks: rasters, pixel diff and the reference comparator.

pub mod compare;
pub mod diff;
pub mod raster;

use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionError;

pub use compare::{ComparisonReport, VisualComparator};
pub use diff::{PixelDiff, pixel_diff};
pub use raster::Raster;

/// Result type for visual operations
pub type VisualResult<T> = Result<T, VisualError>;

/// Errors from screenshot comparison
#[derive(Debug, Error)]
pub enum VisualError {
    /// First run for this name: the capture became the reference.
    /// Never a pass; the scenario has to be rerun against the new baseline.
    #[error("reference image created at {}, rerun required", path.display())]
    ReferenceCreated { path: PathBuf },

    /// Images of different sizes cannot be diffed
    #[error(
        "size mismatch: reference is {}x{}, capture is {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("tolerance must be within 0..=1, got {0}")]
    InvalidTolerance(f64),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
