//! FFmpeg video filter definitions.
//!
//! Encoder parameters are plain argument lists so they can be appended
//! directly to an [`FfmpegCommand`](crate::command::FfmpegCommand).

use reelcut_models::encoding::OUTPUT_PIXEL_FORMAT;
use reelcut_models::{CropRect, EnhancementSpec};

const VIDEO_FILTER_FLAG: &str = "-vf";

/// Build the post-processing parameters for the encoder.
///
/// Always normalizes the pixel format; appends the enhancement filter
/// expression when `enhance` is set.
pub fn build_filter_chain(enhance: bool) -> Vec<String> {
    let mut params = vec!["-pix_fmt".to_string(), OUTPUT_PIXEL_FORMAT.to_string()];
    if enhance {
        params.push(VIDEO_FILTER_FLAG.to_string());
        params.push(EnhancementSpec::filter_expression());
    }
    params
}

/// FFmpeg crop expression for a crop rectangle.
pub fn crop_filter(crop: &CropRect) -> String {
    format!("crop={}:{}:{}:0", crop.width, crop.height, crop.x1)
}

/// Merge a crop into an encoder parameter list.
///
/// The crop runs first so enhancement only processes the visible window.
/// An identity crop leaves the parameters untouched.
pub fn apply_crop(mut params: Vec<String>, crop: &CropRect, frame_width: u32) -> Vec<String> {
    if crop.is_identity(frame_width) {
        return params;
    }

    let crop_expr = crop_filter(crop);
    match params.iter().position(|p| p == VIDEO_FILTER_FLAG) {
        Some(idx) if idx + 1 < params.len() => {
            let existing = std::mem::take(&mut params[idx + 1]);
            params[idx + 1] = format!("{},{}", crop_expr, existing);
        }
        _ => {
            params.push(VIDEO_FILTER_FLAG.to_string());
            params.push(crop_expr);
        }
    }
    params
}
