//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Output container extension
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Pixel format every output is normalized to for player compatibility.
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

/// Contrast multiplier applied by the enhancement pass.
pub const ENHANCE_CONTRAST: f64 = 1.1;
/// Saturation multiplier applied by the enhancement pass.
pub const ENHANCE_SATURATION: f64 = 1.3;
/// Unsharp mask: luma matrix size and amount.
pub const ENHANCE_UNSHARP: &str = "unsharp=5:5:1.0:5:5:0.0";

/// H.264 / AAC encoder settings shared by every clip of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    pub codec: String,
    /// x264 speed/quality preset
    pub preset: String,
    /// Constant rate factor, 0-51, lower is better
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            preset: DEFAULT_PRESET.into(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.into(),
        }
    }
}

impl EncodingConfig {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Codec options for the ffmpeg output side.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let crf = self.crf.to_string();
        [
            ("-c:v", self.codec.as_str()),
            ("-preset", self.preset.as_str()),
            ("-crf", crf.as_str()),
            ("-c:a", self.audio_codec.as_str()),
            ("-b:a", self.audio_bitrate.as_str()),
        ]
        .into_iter()
        .flat_map(|(flag, value)| [flag.to_string(), value.to_string()])
        .collect()
    }
}

/// Optional visual enhancement applied at encode time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnhancementSpec {
    pub enabled: bool,
}

impl EnhancementSpec {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// The fixed enhancement filter expression.
    pub fn filter_expression() -> String {
        format!(
            "eq=contrast={}:saturation={},{}",
            ENHANCE_CONTRAST, ENHANCE_SATURATION, ENHANCE_UNSHARP
        )
    }
}
