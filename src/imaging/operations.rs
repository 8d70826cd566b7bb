//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! Planning is pure (dimensions in, parameters out); execution hands the
//! plan to a backend and returns the encoded bytes.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::crop::plan;
use super::geometry::fit_within;
use super::params::{CropParams, FitParams, OutputFormat, Quality};
use crate::size::Anchor;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// A fully-parameterised pixel operation, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Fit(FitParams),
    CropScale(CropParams),
}

impl Operation {
    /// Dimensions of the encoded output.
    pub fn output(&self) -> Dimensions {
        match self {
            Self::Fit(p) => Dimensions {
                width: p.width,
                height: p.height,
            },
            Self::CropScale(p) => Dimensions {
                width: p.width,
                height: p.height,
            },
        }
    }
}

/// Plan the pixel work for a rendition without executing it.
///
/// - With an anchor: crop the largest target-ratio region, then scale to
///   exactly `target`.
/// - Without: scale the whole source to fit inside `target`, keeping the
///   source aspect ratio.
pub fn plan_rendition(
    source: &Path,
    source_dims: Dimensions,
    target: Dimensions,
    crop: Option<Anchor>,
    format: OutputFormat,
    quality: Quality,
) -> Operation {
    match crop {
        Some(anchor) => Operation::CropScale(CropParams {
            source: source.to_path_buf(),
            crop: plan(source_dims, target, anchor),
            width: target.width,
            height: target.height,
            format,
            quality,
        }),
        None => {
            let fitted = fit_within(source_dims, target);
            Operation::Fit(FitParams {
                source: source.to_path_buf(),
                width: fitted.width,
                height: fitted.height,
                format,
                quality,
            })
        }
    }
}

/// Run a planned operation on the backend, returning the encoded bytes.
pub fn execute(backend: &impl ImageBackend, operation: &Operation) -> Result<Vec<u8>> {
    match operation {
        Operation::Fit(params) => backend.fit(params),
        Operation::CropScale(params) => backend.crop_scale(params),
    }
}
