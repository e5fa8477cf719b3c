//! Multi-pass scheduling
//!
//! Every frame opportunity belongs to exactly one pass, chosen round-robin
//! from the number of frames captured so far. The simulation clock only
//! advances once every pass has seen the current tick.

/// Round-robin pass selection for a fixed number of passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassScheduler {
    pass_count: usize,
}

impl PassScheduler {
    /// `pass_count == 0` means single-pass capture.
    pub fn new(pass_count: usize) -> Self {
        Self { pass_count }
    }

    pub fn is_multi_pass(&self) -> bool {
        self.pass_count > 0
    }

    /// Pass that the next frame belongs to, `None` in single-pass mode.
    pub fn active_pass(&self, captured_frames: u64) -> Option<usize> {
        if !self.is_multi_pass() {
            return None;
        }
        Some((captured_frames % self.pass_count as u64) as usize)
    }

    /// Whether all passes of the current tick have been captured.
    pub fn tick_complete(&self, captured_frames: u64) -> bool {
        self.active_pass(captured_frames).map_or(true, |pass| pass == 0)
    }

    /// Delay before the next simulation step. Zero holds the clock.
    pub fn advance_delay_ms(&self, captured_frames: u64, frame_interval_ms: u32) -> u32 {
        if self.tick_complete(captured_frames) {
            frame_interval_ms
        } else {
            0
        }
    }
}
