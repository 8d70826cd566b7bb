//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`render`](crate::render) module (which decides what
//! rendition to produce) and the [`backend`](super::backend) (which does the
//! actual pixel work). This separation allows swapping backends (e.g. for
//! testing with a mock) without changing the generator.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 82). Clamped on construction.
//! - [`OutputFormat`]: Encoder selection, derived from the source file extension.
//! - [`CropRect`]: Region of the source to keep, in source pixel coordinates.
//! - [`FitParams`]: Scale-to-fit: source, final dimensions, format, quality.
//! - [`CropParams`]: Crop-then-scale: source, crop region, exact target, format, quality.

use serde::Serialize;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(82)
    }
}

/// Encoded format of a source image and of the renditions derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl OutputFormat {
    /// Map a file extension (case-insensitive) to a format.
    ///
    /// Returns `None` for anything outside the supported set.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Canonical extension for files written in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

/// Crop region in source pixel coordinates.
///
/// Produced by [`plan`](super::crop::plan); always fully inside the source:
/// `x + width <= source width` and `y + height <= source height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for a scale-to-fit operation.
///
/// `width`/`height` are the final output dimensions, already fitted to the
/// source aspect ratio by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a crop-then-scale operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub crop: CropRect,
    /// Exact output dimensions after scaling the crop region.
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}
