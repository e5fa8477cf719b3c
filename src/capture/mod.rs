pub mod frame;
pub mod policy;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod transfer;

pub use frame::{PixelFormat, Resolution};
pub use policy::{OutputFormat, VideoCodec};
pub use scheduler::PassScheduler;
pub use session::CaptureManager;
pub use settings::{CaptureSettings, Pass, VisibleElements};
