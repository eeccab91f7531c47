//! Frame geometry: the crop window for a target aspect ratio and focal point.

use reelcut_models::{CropRect, FocalPoint};

/// Round a pixel length down to the nearest even integer.
///
/// H.264 with 4:2:0 chroma subsampling rejects odd frame widths.
pub fn floor_even(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value.floor() as u32) & !1
}

/// Width of a full-height crop at `target_ratio` (width / height).
pub fn target_width(frame_height: u32, target_ratio: f64) -> u32 {
    floor_even(frame_height as f64 * target_ratio)
}

/// Compute the crop rectangle that keeps the full frame height, narrows to
/// `target_ratio` and positions the window around `focal`.
///
/// When the source is already as narrow as the target (or narrower), the
/// identity crop is returned: narrowing further would require padding.
pub fn resolve_crop(
    frame_width: u32,
    frame_height: u32,
    target_ratio: f64,
    focal: FocalPoint,
) -> CropRect {
    let width = target_width(frame_height, target_ratio);

    if width == 0 || width >= frame_width {
        return CropRect::identity(frame_width, frame_height);
    }

    let max_offset = frame_width - width;
    let x1 = (focal.percent() / 100.0 * max_offset as f64)
        .round()
        .clamp(0.0, max_offset as f64) as u32;

    CropRect {
        x1,
        width,
        height: frame_height,
    }
}
