//! Pure calculation functions for rendition dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use crate::size::{SizeError, SizeToken};

/// Largest width/height pair still read as an aspect ratio.
///
/// `16` by `9` is a ratio; `150` by `150` is pixels. Anything where both
/// sides are at or below this threshold is treated as ratio numerals.
pub const RATIO_THRESHOLD: f64 = 21.0;

/// Upper bound on a caller-supplied pixel size.
///
/// Ratio-mode results are bounded by the source instead and never checked
/// against this.
pub const MAX_DIMENSION: u32 = 20_000;

/// Resolve width/height tokens against a source into target dimensions.
///
/// Derived sides are never smaller than one pixel.
///
/// Three modes, checked in order:
///
/// 1. **Aspect ratio**: both tokens numeric and ≤ [`RATIO_THRESHOLD`]. The
///    largest region of the source with that ratio: one side equals the
///    source side, the other is derived. Never exceeds the source.
/// 2. **Auto height**: height is `auto`. Width is taken as-is, height keeps
///    the source aspect ratio.
/// 3. **Explicit**: both numeric. Passed through; may upscale.
///
/// # Examples
/// ```
/// # use rendition::imaging::{Dimensions, resolve};
/// # use rendition::size::SizeToken;
/// let source = Dimensions { width: 4000, height: 3000 };
/// // 16:9 on a 4:3 source spans the full width
/// let target = resolve(source, 16u32.into(), 9u32.into()).unwrap();
/// assert_eq!((target.width, target.height), (4000, 2250));
///
/// // 300 wide, height follows the source
/// let target = resolve(source, 300u32.into(), SizeToken::Auto).unwrap();
/// assert_eq!((target.width, target.height), (300, 225));
/// ```
pub fn resolve(
    source: Dimensions,
    width: SizeToken,
    height: SizeToken,
) -> Result<Dimensions, SizeError> {
    if source.width == 0 || source.height == 0 {
        return Err(SizeError::InvalidSource {
            width: source.width,
            height: source.height,
        });
    }
    let (src_w, src_h) = (source.width as f64, source.height as f64);

    // Ratio mode is bounded by the source; the other modes take caller sizes
    let (target_w, target_h, capped) = match (width, height) {
        (SizeToken::Number(w), SizeToken::Number(h))
            if w <= RATIO_THRESHOLD && h <= RATIO_THRESHOLD =>
        {
            let ratio = w / h;
            if src_w / src_h > ratio {
                // Source is wider: keep full height
                ((src_h * ratio).round().max(1.0), src_h, false)
            } else {
                // Source is taller or equal: keep full width
                (src_w, (src_w / ratio).round().max(1.0), false)
            }
        }
        (SizeToken::Number(w), SizeToken::Auto) => {
            let w = w.trunc();
            (w, (w * src_h / src_w).round().max(1.0), true)
        }
        (SizeToken::Number(w), SizeToken::Number(h)) => (w.trunc(), h.trunc(), true),
        (SizeToken::Auto, _) => {
            return Err(SizeError::InvalidSizeSpec(
                "width cannot be \"auto\"".to_string(),
            ));
        }
    };

    Ok(Dimensions {
        width: checked_side(target_w, "width", capped)?,
        height: checked_side(target_h, "height", capped)?,
    })
}

fn checked_side(value: f64, side: &str, capped: bool) -> Result<u32, SizeError> {
    if value < 1.0 {
        return Err(SizeError::InvalidSizeSpec(format!("{side} resolves to zero pixels")));
    }
    if capped && value > MAX_DIMENSION as f64 {
        return Err(SizeError::InvalidSizeSpec(format!(
            "{side} {value} exceeds the {MAX_DIMENSION}px limit"
        )));
    }
    Ok(value as u32)
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// One side matches the box, the other is at most the box. Used by the
/// scale-to-fit branch, where the output can be narrower or shorter than
/// the requested box.
pub fn fit_within(source: Dimensions, bounds: Dimensions) -> Dimensions {
    let scale = f64::min(
        bounds.width as f64 / source.width as f64,
        bounds.height as f64 / source.height as f64,
    );
    let fit = |side: u32, limit: u32| ((side as f64 * scale).round() as u32).clamp(1, limit);
    Dimensions {
        width: fit(source.width, bounds.width),
        height: fit(source.height, bounds.height),
    }
}
