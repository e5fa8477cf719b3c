//! Resolution presets and encoder profile lookups

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::frame::Resolution;

/// Number of entries in the supported resolution ladder.
pub const SUPPORTED_RESOLUTION_COUNT: usize = 3;

/// What a capture session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Video,
    CameraData,
    ImageSequence,
    #[serde(other)]
    Unknown,
}

/// ProRes profiles selectable for video output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    Prores4444XQ,
    Prores4444,
    Prores422HQ,
    Prores422,
    Prores422LT,
    #[serde(other)]
    Unknown,
}

/// Encoder parameters for a codec choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecProfile {
    pub profile: u8,
    pub pixel_format: &'static str,
}

/// Profile used when the codec is missing or unrecognised.
pub const FALLBACK_PROFILE: CodecProfile = CodecProfile {
    profile: 4,
    pixel_format: "yuv444p10le",
};

/// Entry `i` is `base / (i + 1)`, truncated.
pub fn derive_resolution_ladder(base: Resolution, count: usize) -> Vec<Resolution> {
    (1..=count as u32)
        .map(|k| Resolution::new(base.width / k, base.height / k))
        .collect()
}

/// Never fails; unknown codecs fall back to ProRes 4444 with a warning.
pub fn resolve_codec_profile(codec: Option<VideoCodec>) -> CodecProfile {
    let profile = |profile, pixel_format| CodecProfile {
        profile,
        pixel_format,
    };

    match codec {
        Some(VideoCodec::Prores4444XQ) => profile(5, "yuv444p10le"),
        Some(VideoCodec::Prores4444) => profile(4, "yuv444p10le"),
        Some(VideoCodec::Prores422HQ) => profile(3, "yuv422p10le"),
        Some(VideoCodec::Prores422) => profile(2, "yuv422p10le"),
        Some(VideoCodec::Prores422LT) => profile(1, "yuv422p10le"),
        Some(VideoCodec::Unknown) | None => {
            warn!(
                "Unsupported video codec {:?}, choosing default ({})",
                codec,
                codec_label(VideoCodec::Prores4444)
            );
            FALLBACK_PROFILE
        }
    }
}

pub fn format_label(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Video => "Video",
        OutputFormat::CameraData => "Camera Data",
        OutputFormat::ImageSequence => "Image Sequence",
        OutputFormat::Unknown => "Unknown Output Format",
    }
}

pub fn codec_label(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::Prores4444XQ => "Prores 4444 XQ",
        VideoCodec::Prores4444 => "Prores 4444",
        VideoCodec::Prores422HQ => "Prores 422 HQ",
        VideoCodec::Prores422 => "Prores 422",
        VideoCodec::Prores422LT => "Prores 422 LT",
        VideoCodec::Unknown => "Unknown Video Codec",
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(format_label(*self))
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(codec_label(*self))
    }
}
