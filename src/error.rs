use std::fmt;
use std::io;
use std::path::PathBuf;

/// Step of resource acquisition or frame transfer that a device failure
/// happened in. Logged with every aborted capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    BackBuffer,
    CreateSurface,
    CreateRenderTarget,
    PassEffect,
    StretchCopy,
    Download,
    Lock,
    Write,
    Unlock,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::BackBuffer => "back_buffer",
            Stage::CreateSurface => "create_surface",
            Stage::CreateRenderTarget => "create_render_target",
            Stage::PassEffect => "pass_effect",
            Stage::StretchCopy => "stretch_copy",
            Stage::Download => "download",
            Stage::Lock => "lock",
            Stage::Write => "write",
            Stage::Unlock => "unlock",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Stage::BackBuffer => "failed to acquire backbuffer",
            Stage::CreateSurface => "failed to create host-readable surface",
            Stage::CreateRenderTarget => "failed to create render target",
            Stage::PassEffect => "failed to draw pass effect",
            Stage::StretchCopy => "failed to copy data from backbuffer to render target",
            Stage::Download => "failed to copy render target data to surface",
            Stage::Lock => "failed to lock surface",
            Stage::Write => "failed to write frame to encoder pipe",
            Stage::Unlock => "failed to unlock surface",
        };
        f.write_str(msg)
    }
}

/// Failure reported by a graphics device primitive.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("surface already locked")]
    AlreadyLocked,

    #[error("surface not locked")]
    NotLocked,

    #[error("surface size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("start tick ({start}) must be less than end tick ({end})")]
    InvalidTickRange { start: i32, end: i32 },

    #[error("capture settings cannot change while capturing")]
    SettingsLocked,

    #[error("output format '{0}' cannot be streamed to an encoder")]
    UnsupportedFormat(&'static str),

    #[error("encoder not found at {}", .0.display())]
    EncoderNotFound(PathBuf),

    #[error("failed to open encoder pipe for pass {pass}: {source}")]
    PipeOpen {
        pass: usize,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: {source}")]
    Device {
        stage: Stage,
        #[source]
        source: DeviceError,
    },

    #[error("{}: {source}", Stage::Write)]
    PipeWrite {
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl CaptureError {
    pub fn device(stage: Stage, source: DeviceError) -> Self {
        CaptureError::Device { stage, source }
    }

    /// Stage label for metrics, if the error came from the frame path.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CaptureError::Device { stage, .. } => Some(*stage),
            CaptureError::PipeWrite { .. } => Some(Stage::Write),
            _ => None,
        }
    }
}
