//! Content-addressed rendition cache.
//!
//! Encoding is the expensive part of serving a rendition. This module keeps
//! every generated rendition on disk so the next identical request skips the
//! pixel work entirely.
//!
//! # Design
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: a rendition's file name is derived
//! from the request *after* size resolution:
//!
//! ```text
//! {source_id}-{width}x{height}           scale-to-fit
//! {source_id}-{width}x{height}-{anchor}  cropped, canonical anchor name
//! ```
//!
//! Two requests that resolve to the same dimensions share a file no matter
//! how they were written: `16`/`9` and `4000`/`2250` on a 4000×3000 source
//! both land on `42-4000x2250-center`. Because the key carries no extension,
//! lookups match on the file stem.
//!
//! ## Storage
//!
//! One flat directory of `<key>.<ext>` files plus an access marker
//! (`.htaccess`) written when the directory is created. The marker is never
//! a rendition: lookups, statistics and invalidation all skip it.
//!
//! Writes go to a hidden temporary file in the same directory and are then
//! renamed onto the final name, so a reader never sees a half-written file
//! and two concurrent writers of the same key simply replace each other.
//! There is no locking; identical keys produce identical content.
//!
//! ## Invalidation
//!
//! Deletes are best-effort. [`InvalidationReport`] lists one outcome per file
//! that was attempted, so callers can tell "3 removed" from "3 attempted,
//! 1 failed" and decide whether partial invalidation is acceptable.

use crate::imaging::Dimensions;
use crate::media::SourceId;
use crate::size::Anchor;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Access marker written alongside the renditions.
pub const MARKER_FILENAME: &str = ".htaccess";

const MARKER_CONTENTS: &str = "<IfModule mod_rewrite.c>\nRewriteEngine Off\n</IfModule>\n";

/// Extensions a rendition may be stored under.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const FALLBACK_EXTENSION: &str = "jpg";

/// Distinguishes temporary files written concurrently by one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Deterministic name of a rendition, without extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(source_id: SourceId, target: Dimensions, crop: Option<Anchor>) -> Self {
        let mut key = format!("{}{}x{}", source_prefix(source_id), target.width, target.height);
        if let Some(anchor) = crop {
            key.push('-');
            key.push_str(anchor.as_str());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File-name prefix shared by every rendition of one source.
///
/// The trailing dash keeps source `6` from matching source `64`.
pub fn source_prefix(source_id: SourceId) -> String {
    format!("{source_id}-")
}

/// Map a source extension onto the allow-list, falling back to `jpg`.
pub fn cache_extension(extension: &str) -> &'static str {
    let lower = extension.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .find(|allowed| **allowed == lower)
        .copied()
        .unwrap_or(FALLBACK_EXTENSION)
}

/// A rendition file present in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRendition {
    pub path: PathBuf,
    pub url: String,
}

/// Rendition directory plus the public URL it is served under.
#[derive(Debug, Clone)]
pub struct RenditionCache {
    dir: PathBuf,
    base_url: String,
}

impl RenditionCache {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory and its access marker if missing.
    ///
    /// Idempotent; called before every store.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        let create_err = |source| CacheError::CreateDir {
            path: self.dir.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(create_err)?;
        let marker = self.dir.join(MARKER_FILENAME);
        if !marker.exists() {
            fs::write(&marker, MARKER_CONTENTS).map_err(|source| CacheError::Write {
                path: marker,
                source,
            })?;
        }
        Ok(())
    }

    /// Find the rendition stored under `key`, whatever its extension.
    ///
    /// A missing directory is a miss. If several extensions exist for one
    /// key, the first by file name wins.
    pub fn lookup(&self, key: &CacheKey) -> Option<StoredRendition> {
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.dir)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.file_stem().and_then(|s| s.to_str()) == Some(key.as_str()))
            .collect();
        matches.sort();

        match matches.into_iter().next() {
            Some(path) => {
                debug!(key = %key, "cache hit");
                Some(self.stored(path))
            }
            None => {
                debug!(key = %key, "cache miss");
                None
            }
        }
    }

    /// Write `bytes` as `<key>.<ext>`, replacing any previous file.
    ///
    /// `extension` is mapped through [`cache_extension`].
    pub fn store(
        &self,
        key: &CacheKey,
        bytes: &[u8],
        extension: &str,
    ) -> Result<StoredRendition, CacheError> {
        self.ensure_dir()?;

        let file_name = format!("{}.{}", key, cache_extension(extension));
        let path = self.dir.join(&file_name);
        let temp = self.dir.join(format!(
            ".{}.{}-{}.tmp",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        write_via_temp(&temp, &path, bytes).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        info!(key = %key, bytes = bytes.len(), "stored rendition");
        Ok(self.stored(path))
    }

    /// Delete every rendition of one source.
    pub fn invalidate(&self, source_id: SourceId) -> InvalidationReport {
        let prefix = source_prefix(source_id);
        self.sweep(|name| name.starts_with(&prefix))
    }

    /// Delete everything in the directory except the access marker.
    pub fn invalidate_all(&self) -> InvalidationReport {
        self.sweep(|name| name != MARKER_FILENAME)
    }

    /// Count and total size of the stored renditions.
    pub fn stats(&self) -> CacheStats {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return CacheStats::default();
        };
        entries
            .filter_map(Result::ok)
            .filter(|entry| is_rendition_name(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .fold(CacheStats::default(), |mut stats, meta| {
                stats.files += 1;
                stats.bytes += meta.len();
                stats
            })
    }

    fn sweep(&self, select: impl Fn(&str) -> bool) -> InvalidationReport {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return InvalidationReport::default();
        };
        let mut targets: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| select(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        targets.sort();

        let outcomes = targets
            .into_iter()
            .map(|path| {
                let result = fs::remove_file(&path);
                if let Err(e) = &result {
                    warn!(path = %path.display(), error = %e, "failed to delete rendition");
                }
                DeleteOutcome { path, result }
            })
            .collect();
        InvalidationReport { outcomes }
    }

    fn stored(&self, path: PathBuf) -> StoredRendition {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        StoredRendition {
            url: format!("{}/{}", self.base_url.trim_end_matches('/'), file_name),
            path,
        }
    }
}

/// Renditions are never dot-files; the marker and in-flight writes are.
fn is_rendition_name(name: &str) -> bool {
    !name.starts_with('.')
}

/// Result of deleting one file.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub path: PathBuf,
    pub result: io::Result<()>,
}

/// Per-file outcomes of an invalidation sweep.
#[derive(Debug, Default)]
pub struct InvalidationReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl InvalidationReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Files actually removed.
    pub fn deleted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeleteOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

impl fmt::Display for InvalidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.attempted() - self.deleted();
        if failed > 0 {
            write!(f, "{} deleted, {} failed", self.deleted(), failed)
        } else {
            write!(f, "{} deleted", self.deleted())
        }
    }
}

/// Occupancy of the rendition directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub files: usize,
    pub bytes: u64,
}

/// Write `bytes` to `temp`, then rename it onto `path`.
///
/// The temp file is removed when either step fails.
fn write_via_temp(temp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let result = fs::write(temp, bytes).and_then(|()| fs::rename(temp, path));
    if result.is_err() {
        let _ = fs::remove_file(temp);
    }
    result
}
