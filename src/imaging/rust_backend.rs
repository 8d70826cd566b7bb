//! Image backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP) | `image::ImageReader` with content sniffing |
//! | Scale to fit | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop + scale | `DynamicImage::crop_imm` then `resize_exact` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configured quality |
//! | Encode → PNG / GIF / WebP | `DynamicImage::write_to` (WebP is lossless) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropParams, FitParams, OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is sniffed from the content, so a mislabelled extension still
/// decodes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode a DynamicImage into an in-memory buffer.
fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        OutputFormat::Png => img.write_to(&mut buf, ImageFormat::Png),
        OutputFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, ImageFormat::Gif)
        }
        OutputFormat::WebP => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, ImageFormat::WebP)
        }
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!("{:?} encode failed: {}", format, e))
    })?;
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn fit(&self, params: &FitParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode_image(&resized, params.format, params.quality)
    }

    fn crop_scale(&self, params: &CropParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(&params.source)?;
        let crop = params.crop;
        if crop.x + crop.width > img.width() || crop.y + crop.height > img.height() {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {}x{}+{}+{} outside {}x{} source",
                crop.width,
                crop.height,
                crop.x,
                crop.y,
                img.width(),
                img.height()
            )));
        }
        let scaled = img
            .crop_imm(crop.x, crop.y, crop.width, crop.height)
            .resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode_image(&scaled, params.format, params.quality)
    }
}
