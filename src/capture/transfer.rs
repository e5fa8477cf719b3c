//! Moves one rendered frame from the backbuffer into an encoder pipe
//!
//! backbuffer -> render target (scaled copy) -> host-readable surface ->
//! lock -> exactly `width * height * 4` bytes to the pipe -> unlock

use bytes::BytesMut;
use tracing::{debug, instrument};

use super::frame::Resolution;
use crate::encoder::FrameSink;
use crate::error::{CaptureError, DeviceError, Stage};
use crate::host::{GraphicsDevice, Surface};

/// Device surfaces owned by a running capture
pub struct CaptureSurfaces<S: Surface> {
    back_buffer: S,
    render_target: S,
    readable: S,
    screen: Resolution,
}

impl<S: Surface> CaptureSurfaces<S> {
    /// Acquire the backbuffer and create the intermediate surfaces at its size.
    pub fn acquire<D>(device: &mut D) -> Result<Self, CaptureError>
    where
        D: GraphicsDevice<Surface = S>,
    {
        let back_buffer = device
            .back_buffer()
            .map_err(|e| CaptureError::device(Stage::BackBuffer, e))?;
        let desc = back_buffer.desc();

        let readable = device
            .create_readable_surface(desc)
            .map_err(|e| CaptureError::device(Stage::CreateSurface, e))?;
        let render_target = device
            .create_render_target(desc)
            .map_err(|e| CaptureError::device(Stage::CreateRenderTarget, e))?;

        debug!("Capture surfaces allocated at {}", desc.resolution);
        Ok(Self {
            back_buffer,
            render_target,
            readable,
            screen: desc.resolution,
        })
    }

    /// Resolution of the captured framebuffer
    pub fn screen(&self) -> Resolution {
        self.screen
    }
}

#[derive(Default)]
pub struct FrameTransfer {
    /// Repacking buffer for surfaces with padded rows
    scratch: BytesMut,
}

impl FrameTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current frame out and write it to `sink`.
    ///
    /// `frames_written` is bumped as soon as the pipe accepted the frame,
    /// even if unlocking fails afterwards.
    #[instrument(level = "trace", skip_all, fields(pass = ?pass))]
    pub fn transfer<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        surfaces: &mut CaptureSurfaces<D::Surface>,
        pass: Option<usize>,
        sink: &mut dyn FrameSink,
        frames_written: &mut u64,
    ) -> Result<(), CaptureError> {
        if let Some(pass) = pass {
            device
                .draw_pass_effect(pass)
                .map_err(|e| CaptureError::device(Stage::PassEffect, e))?;
        }

        device
            .stretch_copy(&surfaces.back_buffer, &mut surfaces.render_target)
            .map_err(|e| CaptureError::device(Stage::StretchCopy, e))?;
        device
            .download(&surfaces.render_target, &mut surfaces.readable)
            .map_err(|e| CaptureError::device(Stage::Download, e))?;

        let screen = surfaces.screen;
        let written = {
            let rect = surfaces
                .readable
                .lock()
                .map_err(|e| CaptureError::device(Stage::Lock, e))?;

            match pack_rows(rect.data, rect.pitch, screen, &mut self.scratch) {
                Ok(frame) => sink
                    .write_frame(frame)
                    .map_err(|source| CaptureError::PipeWrite { source }),
                Err(e) => Err(CaptureError::device(Stage::Lock, e)),
            }
        };

        if written.is_ok() {
            *frames_written += 1;
        }

        let unlocked = surfaces
            .readable
            .unlock()
            .map_err(|e| CaptureError::device(Stage::Unlock, e));
        written.and(unlocked)
    }
}

/// Tightly packed frame bytes from a locked surface.
fn pack_rows<'a>(
    data: &'a [u8],
    pitch: usize,
    screen: Resolution,
    scratch: &'a mut BytesMut,
) -> Result<&'a [u8], DeviceError> {
    let row = screen.row_bytes();
    let rows = screen.height as usize;
    let size = screen.frame_byte_size();

    if rows == 0 || row == 0 {
        return Ok(&data[..0]);
    }

    let needed = pitch * (rows - 1) + row;
    if pitch < row || data.len() < needed {
        return Err(DeviceError::SizeMismatch {
            expected: size,
            actual: data.len(),
        });
    }

    if pitch == row {
        return Ok(&data[..size]);
    }

    scratch.clear();
    scratch.reserve(size);
    for y in 0..rows {
        scratch.extend_from_slice(&data[y * pitch..y * pitch + row]);
    }
    Ok(&scratch[..])
}
