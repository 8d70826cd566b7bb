//! Size and crop tokens as callers write them.
//!
//! A rendition request names its size with loosely-typed tokens: `"150px"`,
//! `"150"`, `"auto"`, or small ratio numerals like `16` and `9`. Crop modes
//! come as `false`, `"crop"`, `"crop-top"`, `"bottom-right"` and so on. This
//! module turns those into [`SizeToken`], [`Anchor`] and [`SizeSpec`] so the
//! geometry code only ever sees typed values.
//!
//! Anchors have several accepted spellings but one canonical name
//! ([`Anchor::as_str`]), which is what the cache key uses. `crop`, `center`
//! and `crop-center` therefore share cached files.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizeError {
    #[error("Invalid size spec: {0}")]
    InvalidSizeSpec(String),
    #[error("Invalid source dimensions {width}x{height}")]
    InvalidSource { width: u32, height: u32 },
}

/// One width or height token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeToken {
    /// A positive number: a pixel count, or a ratio term when small.
    Number(f64),
    /// Derive this side from the source aspect ratio.
    Auto,
}

impl SizeToken {
    /// Parse a token, stripping a `px` unit suffix.
    ///
    /// - `"150px"`, `"150"`, `" 150 "` → `Number(150.0)`
    /// - `"auto"` (any case) → `Auto`
    /// - `"0"`, `"-4"`, `"wide"`, `""` → `InvalidSizeSpec`
    pub fn parse(raw: &str) -> Result<Self, SizeError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        let number = strip_unit(trimmed);
        match number.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Ok(Self::Number(value)),
            _ => Err(SizeError::InvalidSizeSpec(format!(
                "expected a positive number or \"auto\", got {raw:?}"
            ))),
        }
    }

    pub fn number(self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Auto => None,
        }
    }
}

fn strip_unit(token: &str) -> &str {
    let lower_len = token.len().saturating_sub(2);
    match token.get(lower_len..) {
        Some(unit) if unit.eq_ignore_ascii_case("px") => token[..lower_len].trim_end(),
        _ => token,
    }
}

impl From<u32> for SizeToken {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl fmt::Display for SizeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) if value.fract() == 0.0 => write!(f, "{}", *value as u64),
            Self::Number(value) => write!(f, "{value}"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

/// Named crop origin deciding which edges of the source survive a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::Center,
        Anchor::Top,
        Anchor::Bottom,
        Anchor::Left,
        Anchor::Right,
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
    ];

    /// Canonical name, used in cache keys and output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Parse a crop-mode token into an optional anchor.
    ///
    /// `None` means scale-to-fit. Unknown anchors are rejected rather than
    /// silently cropping from the top-left corner.
    ///
    /// | Token | Result |
    /// |---|---|
    /// | `""`, `false`, `0`, `no`, `none` | `None` |
    /// | `crop`, `true`, `1` | `Some(Center)` |
    /// | `top`, `crop-top`, `Top-Left`, … | matching anchor |
    pub fn parse_mode(raw: &str) -> Result<Option<Self>, SizeError> {
        let token = raw.trim().to_ascii_lowercase();
        match token.as_str() {
            "" | "false" | "0" | "no" | "none" => return Ok(None),
            "crop" | "true" | "1" => return Ok(Some(Self::Center)),
            _ => {}
        }
        let name = token.strip_prefix("crop-").unwrap_or(&token);
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.as_str() == name)
            .map(Some)
            .ok_or_else(|| SizeError::InvalidSizeSpec(format!("unknown crop anchor {raw:?}")))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendition request before resolution against a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeSpec {
    pub width: SizeToken,
    pub height: SizeToken,
    pub crop: Option<Anchor>,
}

impl SizeSpec {
    pub fn new(width: SizeToken, height: SizeToken, crop: Option<Anchor>) -> Self {
        Self {
            width,
            height,
            crop,
        }
    }

    /// Parse raw tokens. A missing height means `auto`, a missing crop means
    /// scale-to-fit.
    pub fn parse(width: &str, height: Option<&str>, crop: Option<&str>) -> Result<Self, SizeError> {
        Ok(Self {
            width: SizeToken::parse(width)?,
            height: height.map_or(Ok(SizeToken::Auto), SizeToken::parse)?,
            crop: crop.map_or(Ok(None), Anchor::parse_mode)?,
        })
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if let Some(anchor) = self.crop {
            write!(f, " crop {anchor}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // SizeToken
    // =========================================================================

    #[test]
    fn token_strips_px_suffix() {
        assert_eq!(SizeToken::parse("150px").unwrap(), SizeToken::Number(150.0));
        assert_eq!(SizeToken::parse("150PX").unwrap(), SizeToken::Number(150.0));
        assert_eq!(SizeToken::parse("150 px").unwrap(), SizeToken::Number(150.0));
    }

    #[test]
    fn token_plain_number() {
        assert_eq!(SizeToken::parse("16").unwrap(), SizeToken::Number(16.0));
        assert_eq!(SizeToken::parse(" 300 ").unwrap(), SizeToken::Number(300.0));
        assert_eq!(SizeToken::parse("2.35").unwrap(), SizeToken::Number(2.35));
    }

    #[test]
    fn token_auto_any_case() {
        assert_eq!(SizeToken::parse("auto").unwrap(), SizeToken::Auto);
        assert_eq!(SizeToken::parse("AUTO").unwrap(), SizeToken::Auto);
    }

    #[test]
    fn token_rejects_garbage() {
        for raw in ["", "wide", "px", "0", "-4", "NaN", "inf", "12em"] {
            assert!(
                matches!(SizeToken::parse(raw), Err(SizeError::InvalidSizeSpec(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn token_display() {
        assert_eq!(SizeToken::Number(150.0).to_string(), "150");
        assert_eq!(SizeToken::Number(2.5).to_string(), "2.5");
        assert_eq!(SizeToken::Auto.to_string(), "auto");
    }

    // =========================================================================
    // Anchor
    // =========================================================================

    #[test]
    fn crop_mode_disabled_tokens() {
        for raw in ["", "false", "FALSE", "0", "no", "none"] {
            assert_eq!(Anchor::parse_mode(raw).unwrap(), None, "{raw:?}");
        }
    }

    #[test]
    fn crop_mode_center_aliases() {
        for raw in ["crop", "true", "1", "center", "crop-center"] {
            assert_eq!(Anchor::parse_mode(raw).unwrap(), Some(Anchor::Center), "{raw:?}");
        }
    }

    #[test]
    fn crop_mode_prefixed_and_bare_names() {
        assert_eq!(Anchor::parse_mode("crop-top").unwrap(), Some(Anchor::Top));
        assert_eq!(Anchor::parse_mode("bottom").unwrap(), Some(Anchor::Bottom));
        assert_eq!(Anchor::parse_mode("Top-Right").unwrap(), Some(Anchor::TopRight));
        assert_eq!(
            Anchor::parse_mode("crop-bottom-left").unwrap(),
            Some(Anchor::BottomLeft)
        );
    }

    #[test]
    fn crop_mode_roundtrips_every_canonical_name() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::parse_mode(anchor.as_str()).unwrap(), Some(anchor));
        }
    }

    #[test]
    fn crop_mode_unknown_anchor_is_rejected() {
        assert!(matches!(
            Anchor::parse_mode("middle"),
            Err(SizeError::InvalidSizeSpec(_))
        ));
        assert!(matches!(
            Anchor::parse_mode("crop-diagonal"),
            Err(SizeError::InvalidSizeSpec(_))
        ));
    }

    // =========================================================================
    // SizeSpec
    // =========================================================================

    #[test]
    fn spec_defaults_height_auto_and_no_crop() {
        let spec = SizeSpec::parse("300", None, None).unwrap();
        assert_eq!(spec.width, SizeToken::Number(300.0));
        assert_eq!(spec.height, SizeToken::Auto);
        assert_eq!(spec.crop, None);
    }

    #[test]
    fn spec_parses_all_parts() {
        let spec = SizeSpec::parse("16", Some("9"), Some("crop-top")).unwrap();
        assert_eq!(spec.width, SizeToken::Number(16.0));
        assert_eq!(spec.height, SizeToken::Number(9.0));
        assert_eq!(spec.crop, Some(Anchor::Top));
    }

    #[test]
    fn spec_propagates_first_error() {
        assert!(SizeSpec::parse("big", Some("9"), None).is_err());
        assert!(SizeSpec::parse("16", Some("nine"), None).is_err());
        assert!(SizeSpec::parse("16", Some("9"), Some("sideways")).is_err());
    }

    #[test]
    fn spec_display() {
        let spec = SizeSpec::new(150u32.into(), 150u32.into(), Some(Anchor::Center));
        assert_eq!(spec.to_string(), "150x150 crop center");
        let spec = SizeSpec::new(300u32.into(), SizeToken::Auto, None);
        assert_eq!(spec.to_string(), "300xauto");
    }
}
