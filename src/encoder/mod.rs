//! External encoder processes
//!
//! * `command`: argument lists and output naming for one encoder per pass.
//! * `process`: spawning encoders and streaming raw frames into them.

pub mod command;
pub mod process;

pub use command::{build_invocation, EncoderCommandBuilder, EncoderInvocation, EncoderOutput};
pub use process::{
    EncoderLauncher, EncoderPipe, FfmpegLauncher, FrameSink, MemoryLauncher, PipeLedger,
    PipeRecord,
};
