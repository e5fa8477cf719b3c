//! Synthetic host driving a capture through its frame hooks
//!
//! Plays back a recording of `end_tick` ticks on a [`SoftwareDevice`]. One
//! call to [`DemoHost::run_frame`] is one frame opportunity.

use std::collections::HashMap;

use super::{
    CaptureHost, ConfigValueStore, FrameHooks, PlaybackCursor, RendererControl,
    SoftwareDevice, MULTITHREADED_RENDER_VALUE,
};
use crate::capture::frame::Resolution;
use crate::capture::settings::VisibleElements;

pub struct DemoHost {
    device: SoftwareDevice,
    tick: i32,
    end_tick: i32,
    rewinding: bool,
    visible: VisibleElements,
    visibility_resets: usize,
    config_values: HashMap<String, bool>,
    /// Simulation time accumulated from the advance hook, in milliseconds
    sim_time_ms: u64,
}

impl DemoHost {
    pub fn new(resolution: Resolution, end_tick: i32) -> Self {
        Self::with_device(SoftwareDevice::new(resolution), end_tick)
    }

    pub fn with_device(device: SoftwareDevice, end_tick: i32) -> Self {
        let mut config_values = HashMap::new();
        config_values.insert(MULTITHREADED_RENDER_VALUE.to_string(), true);

        Self {
            device,
            tick: 0,
            end_tick,
            rewinding: false,
            visible: VisibleElements::default(),
            visibility_resets: 0,
            config_values,
            sim_time_ms: 0,
        }
    }

    pub fn software_device(&self) -> &SoftwareDevice {
        &self.device
    }

    pub fn set_rewinding(&mut self, rewinding: bool) {
        self.rewinding = rewinding;
    }

    pub fn visible_elements(&self) -> VisibleElements {
        self.visible
    }

    /// Times visibility overrides were reset, once per capture teardown.
    pub fn visibility_resets(&self) -> usize {
        self.visibility_resets
    }

    pub fn sim_time_ms(&self) -> u64 {
        self.sim_time_ms
    }

    pub fn remove_config_value(&mut self, name: &str) {
        self.config_values.remove(name);
    }

    /// Pre-render hook, draw, post-render hook, then one simulation step.
    pub fn run_frame<F: FrameHooks<Self>>(&mut self, hooks: &mut F) {
        hooks.pre_render(self);
        self.device.render(self.tick, &self.visible);
        hooks.post_render(self);

        let delay = hooks.simulation_advance();
        if delay > 0 {
            self.sim_time_ms += u64::from(delay);
            if self.rewinding {
                self.tick = (self.tick - 1).max(0);
            } else {
                self.tick += 1;
            }
        }
    }
}

impl PlaybackCursor for DemoHost {
    fn current_tick(&self) -> i32 {
        self.tick
    }

    fn seek(&mut self, tick: i32) {
        self.tick = tick.clamp(0, self.end_tick);
    }

    fn is_rewinding(&self) -> bool {
        self.rewinding
    }

    fn demo_end_tick(&self) -> Option<i32> {
        Some(self.end_tick)
    }
}

impl RendererControl for DemoHost {
    fn set_visible_elements(&mut self, elements: &VisibleElements) {
        self.visible = *elements;
    }

    fn reset_visible_elements(&mut self) {
        self.visible = VisibleElements::default();
        self.visibility_resets += 1;
    }
}

impl ConfigValueStore for DemoHost {
    fn bool_value(&self, name: &str) -> Option<bool> {
        self.config_values.get(name).copied()
    }

    fn set_bool_value(&mut self, name: &str, value: bool) -> bool {
        match self.config_values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl CaptureHost for DemoHost {
    type Device = SoftwareDevice;

    fn device(&mut self) -> &mut SoftwareDevice {
        &mut self.device
    }
}
