//! Rendition generation: the service that ties the pipeline together.
//!
//! A [`Renderer`] owns one backend, one media store and one cache. A render
//! call runs, in order:
//!
//! 1. **Source**: media store path → backend `identify`.
//! 2. **Resolve**: size tokens → target [`Dimensions`].
//! 3. **Plan**: crop rectangle or scale-to-fit box (pure).
//! 4. **Cache**: a hit returns immediately with no pixel work.
//! 5. **Encode + store** on a miss.
//!
//! The renderer holds no mutable state. It is `Sync` whenever its backend
//! and store are, so one instance can serve many threads; two concurrent
//! misses for the same key both encode and the last write wins.

use crate::cache::{CacheError, CacheKey, InvalidationReport, RenditionCache, cache_extension};
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, OutputFormat, Quality, execute, get_dimensions,
    plan_rendition, resolve,
};
use crate::media::{MediaStore, SourceId, SourceImage, extension_of};
use crate::size::{SizeError, SizeSpec};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),
    #[error("Invalid size spec: {0}")]
    InvalidSizeSpec(String),
    #[error("Invalid source dimensions {width}x{height}")]
    InvalidSource { width: u32, height: u32 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

impl From<SizeError> for RenderError {
    fn from(err: SizeError) -> Self {
        match err {
            SizeError::InvalidSizeSpec(msg) => Self::InvalidSizeSpec(msg),
            SizeError::InvalidSource { width, height } => Self::InvalidSource { width, height },
        }
    }
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        Self::RenderFailed(err.to_string())
    }
}

impl From<CacheError> for RenderError {
    fn from(err: CacheError) -> Self {
        Self::RenderFailed(err.to_string())
    }
}

/// A rendition ready to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendition {
    pub url: String,
    pub path: PathBuf,
    /// Actual output size. Without a crop this can be smaller than the
    /// requested box on one axis.
    pub width: u32,
    pub height: u32,
    /// `true` when served from the cache without encoding.
    pub cached: bool,
}

/// What a caller asked for: a configured preset or explicit tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeRequest {
    Named(String),
    Dimensions(SizeSpec),
}

/// Renderer settings that come from configuration.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub quality: Quality,
    pub presets: BTreeMap<String, SizeSpec>,
}

pub struct Renderer<B: ImageBackend, S: MediaStore> {
    backend: B,
    store: S,
    cache: RenditionCache,
    options: RenderOptions,
}

impl<B: ImageBackend, S: MediaStore> Renderer<B, S> {
    pub fn new(backend: B, store: S, cache: RenditionCache, options: RenderOptions) -> Self {
        Self {
            backend,
            store,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &RenditionCache {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn presets(&self) -> &BTreeMap<String, SizeSpec> {
        &self.options.presets
    }

    /// Produce (or find) the rendition of `source_id` described by `spec`.
    pub fn render(&self, source_id: SourceId, spec: &SizeSpec) -> Result<Rendition, RenderError> {
        let source = self.load_source(source_id)?;
        let source_dims = Dimensions {
            width: source.width,
            height: source.height,
        };
        let target = resolve(source_dims, spec.width, spec.height)?;
        let key = CacheKey::new(source_id, target, spec.crop);

        let operation = plan_rendition(
            &source.path,
            source_dims,
            target,
            spec.crop,
            source.format,
            self.options.quality,
        );
        let output = operation.output();
        debug!(key = %key, spec = %spec, ?operation, "planned rendition");

        if let Some(hit) = self.cache.lookup(&key) {
            return Ok(Rendition {
                url: hit.url,
                path: hit.path,
                width: output.width,
                height: output.height,
                cached: true,
            });
        }

        let bytes = execute(&self.backend, &operation)?;
        let stored = self
            .cache
            .store(&key, &bytes, cache_extension(&extension_of(&source.path)))?;

        Ok(Rendition {
            url: stored.url,
            path: stored.path,
            width: output.width,
            height: output.height,
            cached: false,
        })
    }

    /// Render from raw tokens and return just the URL.
    ///
    /// `height` defaults to `auto`; `crop` accepts any crop mode spelling.
    pub fn render_url(
        &self,
        source_id: SourceId,
        width: &str,
        height: Option<&str>,
        crop: Option<&str>,
    ) -> Result<String, RenderError> {
        let spec = SizeSpec::parse(width, height, crop)?;
        Ok(self.render(source_id, &spec)?.url)
    }

    /// Render a named preset or an explicit size.
    pub fn render_request(
        &self,
        source_id: SourceId,
        request: &SizeRequest,
    ) -> Result<Rendition, RenderError> {
        match request {
            SizeRequest::Named(name) => {
                let spec = self
                    .options
                    .presets
                    .get(name)
                    .ok_or_else(|| RenderError::UnknownPreset(name.clone()))?;
                self.render(source_id, spec)
            }
            SizeRequest::Dimensions(spec) => self.render(source_id, spec),
        }
    }

    /// Delete every cached rendition of one source.
    pub fn invalidate(&self, source_id: SourceId) -> InvalidationReport {
        let report = self.cache.invalidate(source_id);
        info!(
            source = %source_id,
            deleted = report.deleted(),
            attempted = report.attempted(),
            "invalidated source"
        );
        report
    }

    /// Empty the rendition cache, keeping its access marker.
    pub fn invalidate_all(&self) -> InvalidationReport {
        let report = self.cache.invalidate_all();
        info!(deleted = report.deleted(), attempted = report.attempted(), "invalidated cache");
        report
    }

    fn load_source(&self, id: SourceId) -> Result<SourceImage, RenderError> {
        let path = self
            .store
            .source_path(id)
            .filter(|path| path.is_file())
            .ok_or(RenderError::SourceNotFound(id))?;
        let dims = get_dimensions(&self.backend, &path).map_err(|e| {
            debug!(source = %id, error = %e, "identify failed");
            RenderError::SourceNotFound(id)
        })?;
        let format = OutputFormat::from_extension(cache_extension(&extension_of(&path)))
            .unwrap_or(OutputFormat::Jpeg);

        Ok(SourceImage {
            id,
            path,
            width: dims.width,
            height: dims.height,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::CropRect;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::size::{Anchor, SizeToken};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    type TestRenderer = Renderer<MockBackend, HashMap<SourceId, PathBuf>>;

    /// Renderer over a temp library with one placeholder source file.
    /// The mock backend reports `width`x`height` for every source.
    fn renderer(tmp: &TempDir, file: &str, width: u32, height: u32) -> TestRenderer {
        renderer_with(tmp, file, MockBackend::with_dimensions(width, height))
    }

    fn renderer_with(tmp: &TempDir, file: &str, backend: MockBackend) -> TestRenderer {
        let source = tmp.path().join("library").join(file);
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"original").unwrap();

        let mut store = HashMap::new();
        store.insert(SourceId(42), source);

        let mut presets = BTreeMap::new();
        presets.insert(
            "thumbnail".to_string(),
            SizeSpec::parse("150", Some("150"), Some("center")).unwrap(),
        );
        presets.insert("medium_large".to_string(), SizeSpec::parse("768", None, None).unwrap());

        Renderer::new(
            backend,
            store,
            RenditionCache::new(tmp.path().join("cache"), "/uploads/rendition-cache"),
            RenderOptions {
                quality: Quality::new(75),
                presets,
            },
        )
    }

    fn spec(width: &str, height: &str, crop: Option<&str>) -> SizeSpec {
        SizeSpec::parse(width, Some(height), crop).unwrap()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn render_crop_plans_and_stores() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42-harbour.jpg", 4000, 3000);

        let rendition = r.render(SourceId(42), &spec("150px", "150px", Some("crop"))).unwrap();

        assert_eq!(rendition.url, "/uploads/rendition-cache/42-150x150-center.jpg");
        assert_eq!((rendition.width, rendition.height), (150, 150));
        assert!(!rendition.cached);
        assert!(rendition.path.is_file());

        let ops = r.backend.get_operations();
        assert!(ops.contains(&RecordedOp::CropScale {
            source: tmp.path().join("library/42-harbour.jpg").to_string_lossy().to_string(),
            crop: CropRect {
                x: 500,
                y: 0,
                width: 3000,
                height: 3000
            },
            width: 150,
            height: 150,
            format: OutputFormat::Jpeg,
        }));
    }

    #[test]
    fn render_without_crop_fits_inside_box() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.png", 3000, 4000);

        let rendition = r.render(SourceId(42), &spec("800", "600", None)).unwrap();

        // Key carries the requested box, the file the fitted size
        assert_eq!(rendition.url, "/uploads/rendition-cache/42-800x600.png");
        assert_eq!((rendition.width, rendition.height), (450, 600));
        assert!(r.backend.get_operations().iter().any(|op| matches!(
            op,
            RecordedOp::Fit {
                width: 450,
                height: 600,
                format: OutputFormat::Png,
                quality: 75,
                ..
            }
        )));
    }

    #[test]
    fn render_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);
        let s = spec("300", "200", Some("top"));

        let first = r.render(SourceId(42), &s).unwrap();
        let second = r.render(SourceId(42), &s).unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(first.path, second.path);
        assert_eq!((second.width, second.height), (300, 200));
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(r.backend.encode_count(), 1);
    }

    #[test]
    fn ratio_and_explicit_requests_share_a_file() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        let ratio = r.render(SourceId(42), &spec("16", "9", Some("crop"))).unwrap();
        let explicit = r.render(SourceId(42), &spec("4000", "2250", Some("center"))).unwrap();

        assert_eq!(ratio.url, "/uploads/rendition-cache/42-4000x2250-center.jpg");
        assert_eq!(ratio.url, explicit.url);
        assert!(explicit.cached);
        assert_eq!(r.backend.encode_count(), 1);
    }

    #[test]
    fn auto_height_follows_source_ratio() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.webp", 4000, 3000);

        let rendition = r
            .render(SourceId(42), &SizeSpec::parse("300", None, None).unwrap())
            .unwrap();

        assert_eq!(rendition.url, "/uploads/rendition-cache/42-300x225.webp");
        assert_eq!((rendition.width, rendition.height), (300, 225));
    }

    #[test]
    fn unknown_source_extension_encodes_as_jpeg() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.bmp", 100, 100);

        let rendition = r.render(SourceId(42), &spec("40", "40", None)).unwrap();

        assert!(rendition.url.ends_with("/42-40x40.jpg"));
        assert!(r.backend.get_operations().iter().any(|op| matches!(
            op,
            RecordedOp::Fit {
                format: OutputFormat::Jpeg,
                ..
            }
        )));
    }

    #[test]
    fn small_square_request_is_a_ratio() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        // Both sides within the ratio threshold: 1:1 of the source, not 10px
        let ratio = r.render(SourceId(42), &spec("10", "10", None)).unwrap();
        let same = r.render(SourceId(42), &spec("20", "20", None)).unwrap();

        assert!(ratio.url.ends_with("/42-3000x3000.jpg"));
        assert_eq!(ratio.path, same.path);
        assert!(same.cached);
    }

    #[test]
    fn render_url_parses_tokens() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        let url = r
            .render_url(SourceId(42), "150px", Some("150px"), Some("crop-bottom-left"))
            .unwrap();
        assert_eq!(url, "/uploads/rendition-cache/42-150x150-bottom-left.jpg");
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn unknown_id_is_source_not_found() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 100, 100);

        let err = r.render(SourceId(7), &spec("10", "10", None)).unwrap_err();
        assert!(matches!(err, RenderError::SourceNotFound(SourceId(7))));
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 100, 100);
        fs::remove_file(tmp.path().join("library/42.jpg")).unwrap();

        let err = r.render(SourceId(42), &spec("10", "10", None)).unwrap_err();
        assert!(matches!(err, RenderError::SourceNotFound(SourceId(42))));
        assert!(r.backend.get_operations().is_empty());
    }

    #[test]
    fn unreadable_source_is_source_not_found() {
        let tmp = TempDir::new().unwrap();
        let r = renderer_with(&tmp, "42.jpg", MockBackend::new());

        let err = r.render(SourceId(42), &spec("10", "10", None)).unwrap_err();
        assert!(matches!(err, RenderError::SourceNotFound(_)));
    }

    #[test]
    fn zero_sized_source_is_invalid_source() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 0, 300);

        let err = r.render(SourceId(42), &spec("10", "10", None)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidSource {
                width: 0,
                height: 300
            }
        ));
    }

    #[test]
    fn bad_tokens_are_invalid_size_spec() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 100, 100);

        assert!(matches!(
            r.render_url(SourceId(42), "wide", None, None),
            Err(RenderError::InvalidSizeSpec(_))
        ));
        assert!(matches!(
            r.render_url(SourceId(42), "10", Some("10"), Some("diagonal")),
            Err(RenderError::InvalidSizeSpec(_))
        ));
        assert!(matches!(
            r.render(
                SourceId(42),
                &SizeSpec::new(SizeToken::Auto, SizeToken::Number(10.0), None)
            ),
            Err(RenderError::InvalidSizeSpec(_))
        ));
    }

    #[test]
    fn encode_failure_is_render_failed_and_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let r = renderer_with(&tmp, "42.jpg", MockBackend::failing_encode(400, 300));

        let err = r.render(SourceId(42), &spec("10", "10", Some("crop"))).unwrap_err();

        assert!(matches!(err, RenderError::RenderFailed(_)));
        assert_eq!(r.cache().stats().files, 0);
    }

    #[test]
    fn write_failure_is_render_failed() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 400, 300);
        // A regular file where the cache directory should be
        fs::write(tmp.path().join("cache"), b"not a directory").unwrap();

        let err = r.render(SourceId(42), &spec("10", "10", None)).unwrap_err();
        assert!(matches!(err, RenderError::RenderFailed(_)));
    }

    // =========================================================================
    // Presets
    // =========================================================================

    #[test]
    fn named_preset_renders() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        let thumb = r
            .render_request(SourceId(42), &SizeRequest::Named("thumbnail".into()))
            .unwrap();
        assert_eq!(thumb.url, "/uploads/rendition-cache/42-150x150-center.jpg");

        let medium = r
            .render_request(SourceId(42), &SizeRequest::Named("medium_large".into()))
            .unwrap();
        assert_eq!((medium.width, medium.height), (768, 576));
    }

    #[test]
    fn explicit_request_renders() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        let rendition = r
            .render_request(
                SourceId(42),
                &SizeRequest::Dimensions(SizeSpec::new(
                    SizeToken::Number(100.0),
                    SizeToken::Number(100.0),
                    Some(Anchor::TopRight),
                )),
            )
            .unwrap();
        assert!(rendition.url.ends_with("/42-100x100-top-right.jpg"));
    }

    #[test]
    fn unknown_preset_errors() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);

        let err = r
            .render_request(SourceId(42), &SizeRequest::Named("huge".into()))
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownPreset(name) if name == "huge"));
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    #[test]
    fn invalidate_then_render_encodes_again() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);
        let s = spec("150", "150", Some("crop"));

        r.render(SourceId(42), &s).unwrap();
        r.render(SourceId(42), &spec("300", "300", None)).unwrap();
        let report = r.invalidate(SourceId(42));
        assert_eq!(report.deleted(), 2);

        let again = r.render(SourceId(42), &s).unwrap();
        assert!(!again.cached);
        assert_eq!(r.backend.encode_count(), 3);
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let tmp = TempDir::new().unwrap();
        let r = renderer(&tmp, "42.jpg", 4000, 3000);
        r.render(SourceId(42), &spec("40", "40", None)).unwrap();
        r.render(SourceId(42), &spec("60", "60", None)).unwrap();

        let report = r.invalidate_all();

        assert_eq!(report.deleted(), 2);
        assert_eq!(r.cache().stats().files, 0);
        assert!(r.cache().dir().join(crate::cache::MARKER_FILENAME).is_file());
    }

    // =========================================================================
    // Real backend over a scanned library
    // =========================================================================

    #[test]
    fn library_store_with_image_backend() {
        use crate::imaging::RustBackend;
        use crate::media::LibraryStore;
        use crate::test_helpers::setup_library;

        let library = setup_library(&[("64-harbour.jpg", 400, 300), ("2024/7.png", 90, 120)]);
        let store = LibraryStore::scan(library.path(), &[]).unwrap();
        let cache_dir = TempDir::new().unwrap();
        let r = Renderer::new(
            RustBackend::new(),
            store,
            RenditionCache::new(cache_dir.path(), "/r"),
            RenderOptions::default(),
        );

        let cropped = r.render(SourceId(64), &spec("16", "9", Some("bottom"))).unwrap();
        assert_eq!(cropped.url, "/r/64-400x225-bottom.jpg");
        let img = image::open(&cropped.path).unwrap();
        assert_eq!((img.width(), img.height()), (400, 225));

        let fitted = r.render(SourceId(7), &spec("60", "60", None)).unwrap();
        assert_eq!(fitted.url, "/r/7-60x60.png");
        let img = image::open(&fitted.path).unwrap();
        assert_eq!((img.width(), img.height()), (45, 60));
    }

    #[test]
    fn renderer_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<TestRenderer>();
    }
}
