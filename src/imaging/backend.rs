//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, fit, and crop_scale. Both pixel operations return the
//! encoded bytes; writing them to the cache is the caller's job, so a backend
//! never touches the rendition directory.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), which decodes and
//! encodes with the `image` crate.

use super::params::{CropParams, FitParams};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image or a requested rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single renderer can serve concurrent requests.
pub trait ImageBackend: Sync {
    /// Get image dimensions without decoding pixels.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Scale the whole source to `width`x`height` and encode it.
    fn fit(&self, params: &FitParams) -> Result<Vec<u8>, BackendError>;

    /// Crop the source to `params.crop`, scale to the exact target, and encode.
    fn crop_scale(&self, params: &CropParams) -> Result<Vec<u8>, BackendError>;
}
