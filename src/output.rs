//! CLI output formatting.
//!
//! Output is **information-first**: every line leads with the source id and
//! what was asked for, with URLs and paths as indented context lines.
//!
//! ## Render
//!
//! ```text
//! 042 150x150 crop center: encoded
//!     URL: /uploads/rendition-cache/42-150x150-center.jpg
//!     Size: 150x150
//! ```
//!
//! ## Warm
//!
//! ```text
//! 042 thumbnail: cached
//! 042 large: encoded
//! 043 large: failed (Source not found: 43)
//!
//! Warmed 2 renditions (1 encoded, 1 cached), 1 failed
//! ```
//!
//! ## Sources
//!
//! ```text
//! Sources (2)
//! 007 (7.png)
//!     Source: 2024/05/7.png
//! 064 harbour at dusk
//!     Source: 64-harbour-at-dusk.jpg
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::cache::{CacheStats, InvalidationReport};
use crate::media::{LibraryEntry, SourceId};
use crate::render::{RenderError, Rendition};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a source id as at least 3 digits, zero-padded.
fn format_id(id: SourceId) -> String {
    format!("{:0>3}", id.0)
}

fn status(rendition: &Rendition) -> &'static str {
    if rendition.cached { "cached" } else { "encoded" }
}

/// Human-readable byte count with one decimal above 1 KB.
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

// ============================================================================
// Render
// ============================================================================

/// Format one rendition produced by `render` or `preset`.
///
/// `label` is what was asked for: a preset name or a size spec.
pub fn format_rendition(id: SourceId, label: &str, rendition: &Rendition) -> Vec<String> {
    vec![
        format!("{} {}: {}", format_id(id), label, status(rendition)),
        format!("    URL: {}", rendition.url),
        format!("    Size: {}x{}", rendition.width, rendition.height),
    ]
}

pub fn print_rendition(id: SourceId, label: &str, rendition: &Rendition) {
    for line in format_rendition(id, label, rendition) {
        println!("{}", line);
    }
}

// ============================================================================
// Warm
// ============================================================================

/// One `(source, preset)` pair processed by `warm`.
#[derive(Debug)]
pub struct WarmOutcome {
    pub id: SourceId,
    pub preset: String,
    pub result: Result<Rendition, RenderError>,
}

pub fn format_warm_line(outcome: &WarmOutcome) -> String {
    let state = match &outcome.result {
        Ok(rendition) => status(rendition).to_string(),
        Err(e) => format!("failed ({e})"),
    };
    format!("{} {}: {}", format_id(outcome.id), outcome.preset, state)
}

/// Per-pair lines followed by a blank line and a summary.
pub fn format_warm_output(outcomes: &[WarmOutcome]) -> Vec<String> {
    let mut lines: Vec<String> = outcomes.iter().map(format_warm_line).collect();

    let cached = outcomes
        .iter()
        .filter(|o| matches!(&o.result, Ok(r) if r.cached))
        .count();
    let encoded = outcomes
        .iter()
        .filter(|o| matches!(&o.result, Ok(r) if !r.cached))
        .count();
    let failed = outcomes.len() - cached - encoded;

    let mut summary = format!(
        "Warmed {} renditions ({} encoded, {} cached)",
        cached + encoded,
        encoded,
        cached
    );
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(summary);
    lines
}

pub fn print_warm_output(outcomes: &[WarmOutcome]) {
    for line in format_warm_output(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// Invalidate / clear
// ============================================================================

/// `scope` names what was invalidated: a source id or "cache".
pub fn format_invalidation(scope: &str, report: &InvalidationReport) -> Vec<String> {
    let mut lines = vec![format!("Invalidated {}: {}", scope, report)];
    for outcome in report.failed() {
        if let Err(e) = &outcome.result {
            lines.push(format!("    Failed: {} ({})", outcome.path.display(), e));
        }
    }
    lines
}

pub fn print_invalidation(scope: &str, report: &InvalidationReport) {
    for line in format_invalidation(scope, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Stats
// ============================================================================

pub fn format_stats(dir: &Path, stats: &CacheStats) -> Vec<String> {
    vec![
        format!("Cache: {}", dir.display()),
        format!("    Renditions: {}", stats.files),
        format!("    Size: {}", human_bytes(stats.bytes)),
    ]
}

pub fn print_stats(dir: &Path, stats: &CacheStats) {
    for line in format_stats(dir, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Sources
// ============================================================================

/// List library entries with paths shown relative to `root`.
///
/// Titled entries show their title; untitled ones show the file name in
/// parentheses, since the file name is then their only identity.
pub fn format_sources<'a>(
    entries: impl IntoIterator<Item = &'a LibraryEntry>,
    root: &Path,
) -> Vec<String> {
    let mut body = Vec::new();
    let mut count = 0;
    for entry in entries {
        count += 1;
        let filename = entry
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        body.push(if entry.title.is_empty() {
            format!("{} ({})", format_id(entry.id), filename)
        } else {
            format!("{} {}", format_id(entry.id), entry.title)
        });
        let relative = entry.path.strip_prefix(root).unwrap_or(&entry.path);
        body.push(format!("    Source: {}", relative.display()));
    }

    let mut lines = vec![format!("Sources ({})", count)];
    lines.extend(body);
    lines
}

pub fn print_sources<'a>(entries: impl IntoIterator<Item = &'a LibraryEntry>, root: &Path) {
    for line in format_sources(entries, root) {
        println!("{}", line);
    }
}
