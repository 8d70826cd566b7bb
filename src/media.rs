//! Source images and the media store that owns them.
//!
//! The renderer never decides where originals live. It asks a [`MediaStore`]
//! for the path behind a [`SourceId`] and treats "unknown id" and "file is
//! gone" the same way: the source is not found.
//!
//! [`LibraryStore`] is the store used by the CLI: a directory tree where
//! every supported image named `NNN-anything.ext` is source `NNN` (see
//! [`naming`](crate::naming)). Tests and embedders can use a plain
//! `HashMap<SourceId, PathBuf>`.

use crate::imaging::OutputFormat;
use crate::naming::parse_entry_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Library directory not found: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to scan library: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Opaque identity of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SourceId)
    }
}

/// A source as seen by one render call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceImage {
    pub id: SourceId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Lowercased extension of a path, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Resolves source ids to original files.
pub trait MediaStore: Sync {
    /// Path of the original for `id`, if the store knows the id.
    fn source_path(&self, id: SourceId) -> Option<PathBuf>;
}

impl MediaStore for HashMap<SourceId, PathBuf> {
    fn source_path(&self, id: SourceId) -> Option<PathBuf> {
        self.get(&id).cloned()
    }
}

/// A library entry discovered on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryEntry {
    pub id: SourceId,
    pub path: PathBuf,
    pub title: String,
}

/// Directory-backed media store using the `NNN-name.ext` convention.
#[derive(Debug, Clone, Default)]
pub struct LibraryStore {
    entries: BTreeMap<SourceId, LibraryEntry>,
}

impl LibraryStore {
    /// Walk `root` recursively and index every numbered, supported image.
    ///
    /// Directories named in `exclude` (e.g. the rendition cache when it
    /// lives inside the library) are skipped. Paths are compared after
    /// canonicalization, so relative and absolute spellings of the same
    /// directory match. When two files claim the same id, the first in path
    /// order wins and the other is logged.
    pub fn scan(root: &Path, exclude: &[PathBuf]) -> Result<Self, MediaError> {
        if !root.is_dir() {
            return Err(MediaError::NotADirectory(root.to_path_buf()));
        }

        let excluded: Vec<PathBuf> = exclude.iter().map(|p| canonical(p)).collect();
        let mut entries: BTreeMap<SourceId, LibraryEntry> = BTreeMap::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && excluded.contains(&canonical(e.path())))
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if OutputFormat::from_extension(&extension_of(path)).is_none() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let parsed = parse_entry_name(stem);
            let Some(number) = parsed.number else {
                debug!(path = %path.display(), "skipping unnumbered file");
                continue;
            };

            let id = SourceId(number);
            if let Some(existing) = entries.get(&id) {
                warn!(
                    id = %id,
                    kept = %existing.path.display(),
                    ignored = %path.display(),
                    "duplicate source id"
                );
                continue;
            }
            entries.insert(
                id,
                LibraryEntry {
                    id,
                    path: path.to_path_buf(),
                    title: parsed.display_title,
                },
            );
        }

        debug!(root = %root.display(), sources = entries.len(), "indexed library");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical form of `path`, or the path itself when it does not exist.
fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl MediaStore for LibraryStore {
    fn source_path(&self, id: SourceId) -> Option<PathBuf> {
        self.entries.get(&id).map(|e| e.path.clone())
    }
}
