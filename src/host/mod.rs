//! Interfaces to the application being captured.
//!
//! Capture never owns the render loop. The host hands itself to the three
//! [`FrameHooks`] once per frame opportunity, on its render thread, and the
//! capture core talks back through the collaborator traits below. All calls
//! happen on that one thread; nothing here is `Send`.

pub mod demo;
pub mod software;

use std::path::PathBuf;

use crate::capture::frame::{LockedRect, SurfaceDesc};
use crate::capture::settings::VisibleElements;
use crate::error::DeviceError;

pub use demo::DemoHost;
pub use software::{SoftwareDevice, SoftwareSurface};

/// Host config value that switches rendering onto its own thread.
pub const MULTITHREADED_RENDER_VALUE: &str = "r_smp_backend";

/// A device surface. Dropping the handle releases it.
pub trait Surface {
    fn desc(&self) -> SurfaceDesc;

    /// Map a host-readable surface for reading.
    fn lock(&mut self) -> Result<LockedRect<'_>, DeviceError>;

    fn unlock(&mut self) -> Result<(), DeviceError>;
}

/// Graphics device primitives used by frame capture
pub trait GraphicsDevice {
    type Surface: Surface;

    /// Reference to the framebuffer the host just drew.
    fn back_buffer(&mut self) -> Result<Self::Surface, DeviceError>;

    /// GPU-side surface that can receive a scaled copy.
    fn create_render_target(&mut self, desc: SurfaceDesc) -> Result<Self::Surface, DeviceError>;

    /// System-memory surface that can be locked by the CPU.
    fn create_readable_surface(&mut self, desc: SurfaceDesc)
        -> Result<Self::Surface, DeviceError>;

    /// Scaled blit from `src` into `dst`.
    fn stretch_copy(&mut self, src: &Self::Surface, dst: &mut Self::Surface)
        -> Result<(), DeviceError>;

    /// Transfer a render target into a host-readable surface.
    fn download(&mut self, src: &Self::Surface, dst: &mut Self::Surface)
        -> Result<(), DeviceError>;

    /// Post-processing specific to one capture pass, drawn before the copy.
    fn draw_pass_effect(&mut self, pass_index: usize) -> Result<(), DeviceError>;
}

/// Timeline of the recording being played back
pub trait PlaybackCursor {
    fn current_tick(&self) -> i32;

    fn seek(&mut self, tick: i32);

    /// Simulation time is currently running backward.
    fn is_rewinding(&self) -> bool;

    /// Last tick of the recording, once known.
    fn demo_end_tick(&self) -> Option<i32>;
}

/// Which scene elements the renderer draws
pub trait RendererControl {
    fn set_visible_elements(&mut self, elements: &VisibleElements);

    fn reset_visible_elements(&mut self);
}

/// Host configuration variables
pub trait ConfigValueStore {
    fn bool_value(&self, name: &str) -> Option<bool>;

    /// Returns `false` when no such value exists.
    fn set_bool_value(&mut self, name: &str, value: bool) -> bool;
}

/// Persisted user preferences
pub trait PreferencesStore {
    fn output_directory(&self) -> Option<PathBuf>;

    fn set_output_directory(&mut self, path: PathBuf);
}

/// Everything a capture session needs from the host during one hook call.
pub trait CaptureHost: PlaybackCursor + RendererControl + ConfigValueStore {
    type Device: GraphicsDevice;

    fn device(&mut self) -> &mut Self::Device;
}

/// Callbacks a host binds to its frame loop.
pub trait FrameHooks<H> {
    /// Before the host renders a frame.
    fn pre_render(&mut self, host: &mut H);

    /// After the host rendered a frame.
    fn post_render(&mut self, host: &mut H);

    /// Once per simulation step; milliseconds until the next step, zero
    /// holds simulation time.
    fn simulation_advance(&mut self) -> u32;
}
