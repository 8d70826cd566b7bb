//! Filename parsing for the `NNN-name` media library convention.
//!
//! Source files in a library directory carry their numeric id as a prefix:
//! `64-harbour-at-dusk.jpg` is source `64`. The rest of the stem is a human
//! label, shown with dashes turned into spaces:
//! - `64-harbour-at-dusk.jpg` → id 64, "harbour at dusk"
//! - `0007.png` → id 7, no label
//! - `logo.png` → no id (not part of the library)

/// Result of parsing a file stem like `64-harbour-at-dusk`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `64` from `64-harbour-at-dusk`)
    pub number: Option<u64>,
    /// Raw name part after `NNN-`, dashes preserved. Empty if number-only.
    /// For unnumbered entries, this is the full input.
    pub name: String,
    /// Display title: name with dashes converted to spaces.
    pub display_title: String,
}

/// Parse a file stem following the `NNN-name` convention.
///
/// - `"64-harbour-at-dusk"` → number=Some(64), name="harbour-at-dusk"
/// - `"0007"` → number=Some(7), name=""
/// - `"12-"` → number=Some(12), name=""
/// - `"logo"` → number=None, name="logo"
/// - `"v2-banner"` → number=None, name="v2-banner"
pub fn parse_entry_name(name: &str) -> ParsedName {
    let (prefix, rest) = match name.split_once('-') {
        Some((prefix, rest)) => (prefix, rest),
        None => (name, ""),
    };
    match prefix.parse::<u64>() {
        Ok(num) => ParsedName {
            number: Some(num),
            name: rest.to_string(),
            display_title: rest.replace('-', " "),
        },
        Err(_) => ParsedName {
            number: None,
            name: name.to_string(),
            display_title: name.replace('-', " "),
        },
    }
}
