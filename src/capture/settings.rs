use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::frame::Resolution;
use super::policy::{OutputFormat, VideoCodec};
use crate::error::CaptureError;

const DEFAULT_FRAMERATE: NonZeroU32 = match NonZeroU32::new(250) {
    Some(rate) => rate,
    None => panic!("framerate must be non-zero"),
};

/// Scene elements drawn while a pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibleElements {
    pub world: bool,
    pub players: bool,
    pub view_model: bool,
    pub effects: bool,
    pub hud: bool,
}

impl Default for VisibleElements {
    fn default() -> Self {
        Self {
            world: true,
            players: true,
            view_model: true,
            effects: true,
            hud: true,
        }
    }
}

/// One capture pass. Each pass gets its own encoder while capturing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pass {
    pub elements: VisibleElements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// 0 means "not set yet", see [`CaptureSettings::apply_demo_bounds`]
    pub start_tick: i32,
    pub end_tick: i32,
    pub output_format: OutputFormat,
    pub video_codec: Option<VideoCodec>,
    /// Target output resolution. Filled from the backbuffer when absent.
    pub resolution: Option<Resolution>,
    pub framerate: NonZeroU32,
    pub passes: Vec<Pass>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            start_tick: 0,
            end_tick: 0,
            output_format: OutputFormat::Video,
            video_codec: Some(VideoCodec::Prores4444),
            resolution: None,
            framerate: DEFAULT_FRAMERATE,
            passes: Vec::new(),
        }
    }
}

impl CaptureSettings {
    /// Number of encoder processes a session with these settings spawns.
    pub fn pipe_count(&self) -> usize {
        self.passes.len().max(1)
    }

    /// Simulation interval for one output frame.
    pub fn frame_interval_ms(&self) -> u32 {
        1000 / self.framerate.get()
    }

    pub fn validate_tick_range(&self) -> Result<(), CaptureError> {
        if self.start_tick >= self.end_tick {
            return Err(CaptureError::InvalidTickRange {
                start: self.start_tick,
                end: self.end_tick,
            });
        }
        Ok(())
    }

    /// Defaults the tick range to 10%..90% of the demo once its length is
    /// known, unless both ticks were already set.
    pub fn apply_demo_bounds(&mut self, demo_end_tick: i32) -> bool {
        if self.start_tick != 0 && self.end_tick != 0 {
            return false;
        }
        self.start_tick = (demo_end_tick as f64 * 0.1) as i32;
        self.end_tick = (demo_end_tick as f64 * 0.9) as i32;
        true
    }
}
