//! Crop planning: which region of the source survives a crop.
//!
//! The crop region has the target's aspect ratio and is as large as the
//! source allows, so exactly one axis is reduced. The [`Anchor`] picks the
//! offset along that axis. The region is later scaled to the exact target
//! in a single pass.

use super::backend::Dimensions;
use super::params::CropRect;
use crate::size::Anchor;

/// Plan the crop region for `target` inside `source`.
///
/// # Examples
/// ```
/// # use rendition::imaging::{Dimensions, plan_crop};
/// # use rendition::size::Anchor;
/// let source = Dimensions { width: 4000, height: 3000 };
/// let target = Dimensions { width: 150, height: 150 };
/// let rect = plan_crop(source, target, Anchor::Center);
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (500, 0, 3000, 3000));
/// ```
pub fn plan(source: Dimensions, target: Dimensions, anchor: Anchor) -> CropRect {
    let (src_w, src_h) = (source.width as f64, source.height as f64);
    let target_ratio = target.width as f64 / target.height as f64;
    let source_ratio = src_w / src_h;

    let (crop_w, crop_h) = if source_ratio > target_ratio {
        // Source is wider: full height, slice of the width
        ((src_h * target_ratio).round(), src_h)
    } else {
        // Source is taller: full width, slice of the height
        (src_w, (src_w / target_ratio).round())
    };
    let crop_w = (crop_w as u32).clamp(1, source.width);
    let crop_h = (crop_h as u32).clamp(1, source.height);

    let spare_x = source.width - crop_w;
    let spare_y = source.height - crop_h;
    let centered = |spare: u32| (spare as f64 / 2.0).round() as u32;

    let (x, y) = match anchor {
        Anchor::Center => (centered(spare_x), centered(spare_y)),
        Anchor::Top => (centered(spare_x), 0),
        Anchor::Bottom => (centered(spare_x), spare_y),
        Anchor::Left => (0, centered(spare_y)),
        Anchor::Right => (spare_x, centered(spare_y)),
        Anchor::TopLeft => (0, 0),
        Anchor::TopRight => (spare_x, 0),
        Anchor::BottomLeft => (0, spare_y),
        Anchor::BottomRight => (spare_x, spare_y),
    };

    CropRect {
        x,
        y,
        width: crop_w,
        height: crop_h,
    }
}
