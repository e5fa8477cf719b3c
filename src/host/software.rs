//! CPU-backed graphics device
//!
//! Keeps the framebuffer in system memory, counts live surface handles and
//! can be told to fail at any capture stage.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use super::{GraphicsDevice, Surface};
use crate::capture::frame::{LockedRect, PixelFormat, Resolution, SurfaceDesc, BYTES_PER_PIXEL};
use crate::capture::settings::VisibleElements;
use crate::error::{DeviceError, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceKind {
    BackBuffer,
    RenderTarget,
    Readable,
}

enum Storage {
    Shared(Rc<RefCell<Vec<u8>>>),
    Owned(Vec<u8>),
}

#[derive(Default)]
struct Shared {
    live_handles: Cell<usize>,
    fault: Cell<Option<Stage>>,
}

impl Shared {
    fn check(&self, stage: Stage) -> Result<(), DeviceError> {
        if self.fault.get() == Some(stage) {
            return Err(DeviceError::Other(format!("injected fault at {}", stage.as_str())));
        }
        Ok(())
    }
}

pub struct SoftwareSurface {
    kind: SurfaceKind,
    desc: SurfaceDesc,
    pitch: usize,
    storage: Storage,
    locked: bool,
    shared: Rc<Shared>,
}

impl SoftwareSurface {
    fn new(
        kind: SurfaceKind,
        desc: SurfaceDesc,
        pitch: usize,
        storage: Storage,
        shared: Rc<Shared>,
    ) -> Self {
        shared.live_handles.set(shared.live_handles.get() + 1);
        trace!("Created {:?} surface {}", kind, desc.resolution);
        Self {
            kind,
            desc,
            pitch,
            storage,
            locked: false,
            shared,
        }
    }

    fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.storage {
            Storage::Shared(pixels) => f(&pixels.borrow()),
            Storage::Owned(pixels) => f(pixels),
        }
    }

    fn pixels_mut(&mut self) -> Result<&mut Vec<u8>, DeviceError> {
        match &mut self.storage {
            Storage::Owned(pixels) => Ok(pixels),
            Storage::Shared(_) => Err(DeviceError::Other("backbuffer is read-only".into())),
        }
    }
}

impl Surface for SoftwareSurface {
    fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    fn lock(&mut self) -> Result<LockedRect<'_>, DeviceError> {
        self.shared.check(Stage::Lock)?;
        if self.kind != SurfaceKind::Readable {
            return Err(DeviceError::Other(format!("{:?} surface is not lockable", self.kind)));
        }
        if self.locked {
            return Err(DeviceError::AlreadyLocked);
        }
        self.locked = true;
        let pitch = self.pitch;
        Ok(LockedRect {
            data: self.pixels_mut()?.as_slice(),
            pitch,
        })
    }

    fn unlock(&mut self) -> Result<(), DeviceError> {
        self.shared.check(Stage::Unlock)?;
        if !self.locked {
            return Err(DeviceError::NotLocked);
        }
        self.locked = false;
        Ok(())
    }
}

impl Drop for SoftwareSurface {
    fn drop(&mut self) {
        self.shared.live_handles.set(self.shared.live_handles.get() - 1);
        trace!("Released {:?} surface", self.kind);
    }
}

/// Graphics device rendering into a system-memory framebuffer
pub struct SoftwareDevice {
    resolution: Resolution,
    framebuffer: Rc<RefCell<Vec<u8>>>,
    /// Extra bytes at the end of every row of readable surfaces
    row_padding: usize,
    pass_effects: Vec<u64>,
    shared: Rc<Shared>,
}

impl SoftwareDevice {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            framebuffer: Rc::new(RefCell::new(vec![0; resolution.frame_byte_size()])),
            row_padding: 0,
            pass_effects: Vec::new(),
            shared: Rc::new(Shared::default()),
        }
    }

    /// Pad readable surface rows, as drivers do for alignment.
    pub fn with_row_padding(mut self, padding: usize) -> Self {
        self.row_padding = padding;
        self
    }

    /// Surfaces handed out and not yet dropped.
    pub fn live_handles(&self) -> usize {
        self.shared.live_handles.get()
    }

    /// Make every call at `stage` fail until cleared.
    pub fn inject_fault(&self, stage: Option<Stage>) {
        self.shared.fault.set(stage);
    }

    /// How many times the effect for `pass_index` was drawn.
    pub fn pass_effect_count(&self, pass_index: usize) -> u64 {
        self.pass_effects.get(pass_index).copied().unwrap_or(0)
    }

    /// Draw a test pattern for `tick` honoring the visible elements.
    pub fn render(&mut self, tick: i32, elements: &VisibleElements) {
        let width = self.resolution.width as usize;
        let mut pixels = self.framebuffer.borrow_mut();
        for (i, px) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let (x, y) = (i % width, i / width);
            px[0] = if elements.world { tick as u8 } else { 0 };
            px[1] = if elements.players { x as u8 } else { 0 };
            px[2] = if elements.effects { y as u8 } else { 0 };
            px[3] = if elements.hud { 0xff } else { 0 };
        }
    }

    fn desc(&self) -> SurfaceDesc {
        SurfaceDesc {
            resolution: self.resolution,
            format: PixelFormat::Bgra8,
        }
    }
}

impl GraphicsDevice for SoftwareDevice {
    type Surface = SoftwareSurface;

    fn back_buffer(&mut self) -> Result<SoftwareSurface, DeviceError> {
        self.shared.check(Stage::BackBuffer)?;
        Ok(SoftwareSurface::new(
            SurfaceKind::BackBuffer,
            self.desc(),
            self.resolution.row_bytes(),
            Storage::Shared(self.framebuffer.clone()),
            self.shared.clone(),
        ))
    }

    fn create_render_target(&mut self, desc: SurfaceDesc) -> Result<SoftwareSurface, DeviceError> {
        self.shared.check(Stage::CreateRenderTarget)?;
        Ok(SoftwareSurface::new(
            SurfaceKind::RenderTarget,
            desc,
            desc.resolution.row_bytes(),
            Storage::Owned(vec![0; desc.resolution.frame_byte_size()]),
            self.shared.clone(),
        ))
    }

    fn create_readable_surface(
        &mut self,
        desc: SurfaceDesc,
    ) -> Result<SoftwareSurface, DeviceError> {
        self.shared.check(Stage::CreateSurface)?;
        let pitch = desc.resolution.row_bytes() + self.row_padding;
        Ok(SoftwareSurface::new(
            SurfaceKind::Readable,
            desc,
            pitch,
            Storage::Owned(vec![0; pitch * desc.resolution.height as usize]),
            self.shared.clone(),
        ))
    }

    fn stretch_copy(
        &mut self,
        src: &SoftwareSurface,
        dst: &mut SoftwareSurface,
    ) -> Result<(), DeviceError> {
        self.shared.check(Stage::StretchCopy)?;
        let (src_res, src_pitch) = (src.desc.resolution, src.pitch);
        let (dst_res, dst_pitch) = (dst.desc.resolution, dst.pitch);

        src.with_pixels(|from| -> Result<(), DeviceError> {
            let to = dst.pixels_mut()?;
            // Nearest neighbour
            for y in 0..dst_res.height as usize {
                let sy = y * src_res.height as usize / dst_res.height as usize;
                for x in 0..dst_res.width as usize {
                    let sx = x * src_res.width as usize / dst_res.width as usize;
                    let s = sy * src_pitch + sx * BYTES_PER_PIXEL;
                    let d = y * dst_pitch + x * BYTES_PER_PIXEL;
                    to[d..d + BYTES_PER_PIXEL].copy_from_slice(&from[s..s + BYTES_PER_PIXEL]);
                }
            }
            Ok(())
        })
    }

    fn download(
        &mut self,
        src: &SoftwareSurface,
        dst: &mut SoftwareSurface,
    ) -> Result<(), DeviceError> {
        self.shared.check(Stage::Download)?;
        if src.desc.resolution != dst.desc.resolution {
            return Err(DeviceError::SizeMismatch {
                expected: src.desc.resolution.frame_byte_size(),
                actual: dst.desc.resolution.frame_byte_size(),
            });
        }
        let row = src.desc.resolution.row_bytes();
        let (src_pitch, dst_pitch) = (src.pitch, dst.pitch);
        let rows = src.desc.resolution.height as usize;

        src.with_pixels(|from| -> Result<(), DeviceError> {
            let to = dst.pixels_mut()?;
            for y in 0..rows {
                to[y * dst_pitch..y * dst_pitch + row]
                    .copy_from_slice(&from[y * src_pitch..y * src_pitch + row]);
            }
            Ok(())
        })
    }

    fn draw_pass_effect(&mut self, pass_index: usize) -> Result<(), DeviceError> {
        self.shared.check(Stage::PassEffect)?;
        if self.pass_effects.len() <= pass_index {
            self.pass_effects.resize(pass_index + 1, 0);
        }
        self.pass_effects[pass_index] += 1;
        Ok(())
    }
}
