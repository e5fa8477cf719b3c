use std::fmt;

use serde::{Deserialize, Serialize};

/// Bytes per pixel of every frame streamed to an encoder.
pub const BYTES_PER_PIXEL: usize = 4;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of one tightly packed 32-bit frame at this resolution.
    pub fn frame_byte_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Row length in bytes without padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layouts a capture surface can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Bgra8,
}

impl PixelFormat {
    /// Name the encoder uses for this layout on its raw input.
    pub fn encoder_name(self) -> &'static str {
        match self {
            PixelFormat::Bgra8 => "bgra",
        }
    }
}

/// Description of a device surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    pub resolution: Resolution,
    pub format: PixelFormat,
}

/// Read view of a locked host-readable surface.
pub struct LockedRect<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of two consecutive rows
    pub pitch: usize,
}
