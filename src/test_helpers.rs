//! Shared test utilities: synthetic image fixtures.
//!
//! Fixtures are generated with the `image` encoders rather than checked in,
//! so any size can be produced on demand.
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_library(&[("64-harbour.jpg", 400, 300), ("7.png", 50, 80)]);
//! let store = LibraryStore::scan(tmp.path(), &[]).unwrap();
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::Path;
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small valid PNG file with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::png::PngEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Temp library directory holding one synthetic image per `(name, w, h)`.
///
/// `.png` names get a PNG, everything else a JPEG. Parent directories in
/// `name` are created.
pub fn setup_library(files: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, width, height) in files {
        let path = tmp.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        if name.ends_with(".png") {
            create_test_png(&path, *width, *height);
        } else {
            create_test_jpeg(&path, *width, *height);
        }
    }
    tmp
}
