//! # Rendition
//!
//! On-demand image renditions with a persistent file cache. A caller names a
//! source image by id and a target size; the crate resolves the size against
//! the source, crops or scales the original, encodes it, and hands back a
//! public URL. Identical requests after the first are served from disk.
//!
//! # Architecture: One Request, Four Steps
//!
//! ```text
//! 1. Resolve   "16" x "9" + 4000x3000 source  →  4000x2250     (pure)
//! 2. Plan      4000x2250 + anchor "top"       →  crop rect     (pure)
//! 3. Cache     42-4000x2250-top               →  hit? done
//! 4. Render    crop + Lanczos3 scale + encode →  store, return URL
//! ```
//!
//! Steps 1 and 2 are pure functions over dimensions, so the arithmetic that
//! decides every output pixel is unit tested without decoding an image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`size`] | Size tokens (`150px`, `auto`, `16`), crop anchors, [`size::SizeSpec`] |
//! | [`imaging`] | Geometry resolver, crop planner, backend trait and the `image`-crate backend |
//! | [`cache`] | Content-addressed rendition directory: keys, lookup, atomic store, invalidation |
//! | [`media`] | Source ids and the media store that maps them to originals |
//! | [`render`] | [`render::Renderer`], the service object that runs a request end to end |
//! | [`config`] | `rendition.toml` loading, merging, validation and presets |
//! | [`naming`] | `NNN-name` filename convention used by the library scanner |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Cache Keys From Resolved Sizes
//!
//! The key is built after resolution, so a ratio request (`16`/`9`) and an
//! explicit one (`4000`/`2250`) that land on the same pixels share a file.
//! Anchors are keyed by canonical name, so `crop` and `center` share too.
//!
//! ## Service Object, No Globals
//!
//! [`render::Renderer`] owns its backend, media store and cache. Tests swap
//! in a recording mock backend and a `HashMap` store; the CLI wires the real
//! backend and a scanned library directory.
//!
//! ## Whole-File Writes
//!
//! Renditions are written to a hidden temporary file and renamed into place.
//! Readers never see a partial file, and concurrent renders of the same key
//! need no locking.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod media;
pub mod naming;
pub mod output;
pub mod render;
pub mod size;

#[cfg(test)]
pub(crate) mod test_helpers;
