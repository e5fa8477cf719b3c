//! Capture session state machine
//!
//! `Idle -> Capturing -> Idle`. Everything a running capture owns lives in
//! [`ActiveCapture`]; leaving `Capturing` by any path drops it, which closes
//! the encoder pipes and releases the device surfaces.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use super::frame::Resolution;
use super::policy::{
    derive_resolution_ladder, format_label, OutputFormat, SUPPORTED_RESOLUTION_COUNT,
};
use super::scheduler::PassScheduler;
use super::settings::CaptureSettings;
use super::transfer::{CaptureSurfaces, FrameTransfer};
use crate::encoder::{build_invocation, EncoderLauncher, FrameSink};
use crate::error::CaptureError;
use crate::host::{
    CaptureHost, FrameHooks, GraphicsDevice, PreferencesStore, Surface,
    MULTITHREADED_RENDER_VALUE,
};
use crate::utils::{default_output_directory, ensure_directory};

type SurfaceOf<H> = <<H as CaptureHost>::Device as GraphicsDevice>::Surface;

struct ActiveCapture<S: Surface> {
    surfaces: CaptureSurfaces<S>,
    /// One pipe per pass, or a single pipe without passes
    pipes: Vec<Box<dyn FrameSink>>,
    scheduler: PassScheduler,
    frame_prepared: bool,
}

enum CaptureState<S: Surface> {
    Idle,
    Capturing(ActiveCapture<S>),
}

/// Owns capture settings and the session running on top of them.
pub struct CaptureManager<H: CaptureHost> {
    settings: CaptureSettings,
    state: CaptureState<SurfaceOf<H>>,
    captured_frame_count: u64,
    encoder_not_found: bool,
    supported_resolutions: Vec<Resolution>,
    launcher: Box<dyn EncoderLauncher>,
    preferences: Box<dyn PreferencesStore>,
    transfer: FrameTransfer,
}

impl<H: CaptureHost> CaptureManager<H> {
    pub fn new(
        settings: CaptureSettings,
        launcher: Box<dyn EncoderLauncher>,
        preferences: Box<dyn PreferencesStore>,
    ) -> Self {
        Self {
            settings,
            state: CaptureState::Idle,
            captured_frame_count: 0,
            encoder_not_found: false,
            supported_resolutions: Vec::new(),
            launcher,
            preferences,
            transfer: FrameTransfer::new(),
        }
    }

    /// One-time setup once the host's device is up.
    ///
    /// Forces single-threaded rendering so the hooks are the only device
    /// users, derives the resolution presets from the backbuffer and fills
    /// in defaults the user has not chosen.
    pub fn initialize(&mut self, host: &mut H) {
        if !host.set_bool_value(MULTITHREADED_RENDER_VALUE, false) {
            error!("Could not set {}; value not found", MULTITHREADED_RENDER_VALUE);
        }

        match host.device().back_buffer() {
            Ok(back_buffer) => {
                let game_resolution = back_buffer.desc().resolution;
                self.supported_resolutions =
                    derive_resolution_ladder(game_resolution, SUPPORTED_RESOLUTION_COUNT);
                if self.settings.resolution.is_none() {
                    self.settings.resolution = Some(game_resolution);
                }
                debug!("Game resolution {}", game_resolution);
            }
            Err(e) => {
                error!("Failed to get backbuffer, capture resolution not found: {}", e);
            }
        }

        if self.configured_output_directory().is_none() {
            self.preferences.set_output_directory(default_output_directory());
        }

        if let Some(end_tick) = host.demo_end_tick() {
            self.on_demo_bounds_determined(end_tick);
        }
    }

    /// Listener for the host learning the recording's length.
    pub fn on_demo_bounds_determined(&mut self, demo_end_tick: i32) {
        if self.settings.apply_demo_bounds(demo_end_tick) {
            info!(
                "Capture range defaulted to ticks {}..{}",
                self.settings.start_tick, self.settings.end_tick
            );
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Mutate settings; only allowed while idle.
    pub fn update_settings(
        &mut self,
        f: impl FnOnce(&mut CaptureSettings),
    ) -> Result<(), CaptureError> {
        if self.is_capturing() {
            return Err(CaptureError::SettingsLocked);
        }
        f(&mut self.settings);
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    pub fn captured_frame_count(&self) -> u64 {
        self.captured_frame_count
    }

    /// Set when the last start attempt found no encoder binary.
    pub fn encoder_not_found(&self) -> bool {
        self.encoder_not_found
    }

    pub fn supported_resolutions(&self) -> &[Resolution] {
        &self.supported_resolutions
    }

    pub fn output_directory(&self) -> PathBuf {
        self.configured_output_directory()
            .unwrap_or_else(default_output_directory)
    }

    fn configured_output_directory(&self) -> Option<PathBuf> {
        self.preferences
            .output_directory()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    pub fn toggle_capture(&mut self, host: &mut H) {
        if self.is_capturing() {
            self.stop_capture(host);
        } else {
            // Already logged; the host only sees that capture did not start
            let _ = self.start_capture(host);
        }
    }

    #[instrument(skip_all, fields(start = self.settings.start_tick, end = self.settings.end_tick))]
    pub fn start_capture(&mut self, host: &mut H) -> Result<(), CaptureError> {
        if self.is_capturing() {
            warn!("Capture already running");
            return Ok(());
        }

        // Configuration errors leave everything untouched
        if let Err(e) = self.check_settings() {
            error!("{}", e);
            return Err(e);
        }

        match self.acquire(host) {
            Ok(active) => {
                self.state = CaptureState::Capturing(active);
                Ok(())
            }
            Err(e) => {
                error!("Failed to start capture: {}", e);
                self.stop_capture(host);
                Err(e)
            }
        }
    }

    fn check_settings(&self) -> Result<(), CaptureError> {
        self.settings.validate_tick_range()?;
        match self.settings.output_format {
            OutputFormat::Video | OutputFormat::ImageSequence => Ok(()),
            other => Err(CaptureError::UnsupportedFormat(format_label(other))),
        }
    }

    fn acquire(&mut self, host: &mut H) -> Result<ActiveCapture<SurfaceOf<H>>, CaptureError> {
        let output_dir = self.output_directory();
        ensure_directory(&output_dir)?;

        host.seek(self.settings.start_tick);
        self.captured_frame_count = 0;

        let target = self.settings.resolution;
        info!(
            "Starting capture at {} ({} fps)",
            target.map_or_else(|| "native".to_string(), |r| r.to_string()),
            self.settings.framerate
        );

        let surfaces = CaptureSurfaces::acquire(host.device())?;
        let screen = surfaces.screen();

        if !self.launcher.is_available() {
            self.encoder_not_found = true;
            return Err(CaptureError::EncoderNotFound(
                self.launcher.binary().to_path_buf(),
            ));
        }
        self.encoder_not_found = false;

        let mut pipes = Vec::with_capacity(self.settings.pipe_count());
        for pass in 0..self.settings.pipe_count() {
            let invocation = build_invocation(
                self.launcher.binary(),
                &self.settings,
                &output_dir,
                screen,
                pass,
            )?;
            debug!("Encoder command: {}", invocation);

            let pipe = self
                .launcher
                .launch(&invocation)
                .map_err(|source| CaptureError::PipeOpen { pass, source })?;
            pipes.push(pipe);
        }

        Ok(ActiveCapture {
            surfaces,
            pipes,
            scheduler: PassScheduler::new(self.settings.passes.len()),
            frame_prepared: false,
        })
    }

    /// Leave `Capturing`. Safe from any state, any number of times.
    pub fn stop_capture(&mut self, host: &mut H) {
        let state = std::mem::replace(&mut self.state, CaptureState::Idle);
        host.reset_visible_elements();

        if let CaptureState::Capturing(mut active) = state {
            for (pass, pipe) in active.pipes.iter_mut().enumerate() {
                if let Err(e) = pipe.close() {
                    warn!("Failed to close encoder pipe for pass {}: {}", pass, e);
                }
            }
            debug!("Releasing capture surfaces");
            drop(active);
        }

        info!("Stopped capture (wrote {} frames)", self.captured_frame_count);
    }

    fn prepare_frame(&mut self, host: &mut H) {
        let CaptureState::Capturing(active) = &mut self.state else {
            return;
        };
        // Rewinding only skips visibility; the frame is still captured
        if !host.is_rewinding() {
            if let Some(pass) = active.scheduler.active_pass(self.captured_frame_count) {
                if let Some(pass) = self.settings.passes.get(pass) {
                    host.set_visible_elements(&pass.elements);
                }
            }
        }
        active.frame_prepared = true;
    }

    fn capture_frame(&mut self, host: &mut H) {
        let CaptureState::Capturing(active) = &mut self.state else {
            return;
        };
        if !std::mem::take(&mut active.frame_prepared) {
            return;
        }

        let started = Instant::now();
        let pass = active.scheduler.active_pass(self.captured_frame_count);
        let result = match active.pipes.get_mut(pass.unwrap_or(0)) {
            Some(pipe) => self.transfer.transfer(
                host.device(),
                &mut active.surfaces,
                pass,
                pipe.as_mut(),
                &mut self.captured_frame_count,
            ),
            None => Err(CaptureError::PipeWrite {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no pipe for pass"),
            }),
        };

        if let Err(e) = result {
            error!("{}", e);
            let stage = e.stage().map_or("unknown", |stage| stage.as_str());
            metrics::counter!("capture_aborts_total", "stage" => stage).increment(1);
            self.stop_capture(host);
            return;
        }

        metrics::histogram!("capture_frame_time_us").record(started.elapsed().as_micros() as f64);
        metrics::counter!("captured_frames_total").increment(1);

        if !host.is_rewinding() && host.current_tick() > self.settings.end_tick {
            info!("Reached end tick {}", self.settings.end_tick);
            self.stop_capture(host);
        }
    }

    fn advance_delay_ms(&self) -> u32 {
        let interval = self.settings.frame_interval_ms();
        match &self.state {
            CaptureState::Capturing(active) => active
                .scheduler
                .advance_delay_ms(self.captured_frame_count, interval),
            CaptureState::Idle => interval,
        }
    }
}

impl<H: CaptureHost> FrameHooks<H> for CaptureManager<H> {
    fn pre_render(&mut self, host: &mut H) {
        self.prepare_frame(host);
    }

    fn post_render(&mut self, host: &mut H) {
        self.capture_frame(host);
    }

    fn simulation_advance(&mut self) -> u32 {
        self.advance_delay_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::policy::VideoCodec;
    use crate::capture::settings::{Pass, VisibleElements};
    use crate::encoder::{MemoryLauncher, PipeLedger};
    use crate::error::Stage;
    use crate::host::{ConfigValueStore, DemoHost, PlaybackCursor};
    use tempfile::{tempdir, TempDir};

    struct TestPreferences(Option<PathBuf>);

    impl PreferencesStore for TestPreferences {
        fn output_directory(&self) -> Option<PathBuf> {
            self.0.clone()
        }

        fn set_output_directory(&mut self, path: PathBuf) {
            self.0 = Some(path);
        }
    }

    struct Fixture {
        manager: CaptureManager<DemoHost>,
        host: DemoHost,
        ledger: PipeLedger,
        _dir: TempDir,
    }

    fn passes(n: usize) -> Vec<Pass> {
        (0..n)
            .map(|i| Pass {
                elements: VisibleElements {
                    hud: i % 2 == 0,
                    ..Default::default()
                },
            })
            .collect()
    }

    fn fixture_with(launcher: MemoryLauncher, pass_count: usize) -> Fixture {
        let dir = tempdir().unwrap();
        let ledger = launcher.ledger();
        let settings = CaptureSettings {
            start_tick: 10,
            end_tick: 1000,
            passes: passes(pass_count),
            ..Default::default()
        };
        let mut host = DemoHost::new(Resolution::new(16, 8), 2000);
        let mut manager = CaptureManager::new(
            settings,
            Box::new(launcher),
            Box::new(TestPreferences(Some(dir.path().join("out")))),
        );
        manager.initialize(&mut host);
        Fixture {
            manager,
            host,
            ledger,
            _dir: dir,
        }
    }

    fn fixture(pass_count: usize) -> Fixture {
        fixture_with(MemoryLauncher::new(), pass_count)
    }

    #[test]
    fn start_then_stop_releases_everything() {
        for n in 0..4 {
            let mut f = fixture(n);
            f.manager.start_capture(&mut f.host).unwrap();
            assert!(f.manager.is_capturing());
            assert_eq!(f.ledger.open_pipes(), n.max(1));
            assert_eq!(f.host.software_device().live_handles(), 3);
            assert_eq!(f.host.current_tick(), 10);

            f.manager.stop_capture(&mut f.host);
            assert!(!f.manager.is_capturing());
            assert_eq!(f.ledger.open_pipes(), 0);
            assert_eq!(f.host.software_device().live_handles(), 0);
        }
    }

    #[test]
    fn passes_receive_frames_round_robin() {
        for n in 1..=4usize {
            for m in [1u64, 5, 12, 13] {
                let mut f = fixture(n);
                f.manager.start_capture(&mut f.host).unwrap();
                for _ in 0..m {
                    f.host.run_frame(&mut f.manager);
                }
                assert_eq!(f.manager.captured_frame_count(), m);

                let records = f.ledger.records();
                assert_eq!(records.len(), n);
                let (lo, hi) = (m / n as u64, (m + n as u64 - 1) / n as u64);
                for record in &records {
                    assert!(record.frames == lo || record.frames == hi, "n={n} m={m}");
                    assert_eq!(record.bytes, record.frames * 16 * 8 * 4);
                }
                assert_eq!(f.ledger.total_frames(), m);
            }
        }
    }

    #[test]
    fn simulation_held_until_tick_complete() {
        let interval = CaptureSettings::default().frame_interval_ms();
        for n in 1..=3usize {
            let mut f = fixture(n);
            f.manager.start_capture(&mut f.host).unwrap();
            for call in 1..=(n * 4) {
                f.manager.pre_render(&mut f.host);
                f.manager.post_render(&mut f.host);
                let delay = f.manager.simulation_advance();
                let expected = if call % n == 0 { interval } else { 0 };
                assert_eq!(delay, expected, "n={n} call={call}");
            }
        }

        let mut f = fixture(0);
        f.manager.start_capture(&mut f.host).unwrap();
        for _ in 0..5 {
            f.host.run_frame(&mut f.manager);
            assert_eq!(f.manager.simulation_advance(), interval);
        }
    }

    #[test]
    fn every_pass_sees_the_same_tick() {
        let mut f = fixture(3);
        f.manager.start_capture(&mut f.host).unwrap();
        let mut ticks = Vec::new();
        for _ in 0..6 {
            ticks.push(f.host.current_tick());
            f.host.run_frame(&mut f.manager);
        }
        assert_eq!(ticks, vec![10, 10, 10, 11, 11, 11]);
    }

    #[test]
    fn invalid_tick_range_touches_nothing() {
        let mut f = fixture(2);
        f.manager
            .update_settings(|s| {
                s.start_tick = 100;
                s.end_tick = 100;
            })
            .unwrap();

        let err = f.manager.start_capture(&mut f.host).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidTickRange { .. }));
        assert!(!f.manager.is_capturing());
        assert_eq!(f.ledger.opened(), 0);
        assert_eq!(f.host.software_device().live_handles(), 0);
        assert_eq!(f.host.visibility_resets(), 0);
        assert_eq!(f.host.current_tick(), 0);
    }

    #[test]
    fn lock_failure_stops_once() {
        let mut f = fixture(2);
        f.manager.start_capture(&mut f.host).unwrap();
        for _ in 0..3 {
            f.host.run_frame(&mut f.manager);
        }
        assert_eq!(f.manager.captured_frame_count(), 3);

        f.host.software_device().inject_fault(Some(Stage::Lock));
        f.host.run_frame(&mut f.manager);

        assert!(!f.manager.is_capturing());
        assert_eq!(f.host.visibility_resets(), 1);
        assert_eq!(f.manager.captured_frame_count(), 3);
        assert_eq!(f.ledger.open_pipes(), 0);
        assert_eq!(f.host.software_device().live_handles(), 0);

        // Further frames are no-ops
        f.host.run_frame(&mut f.manager);
        assert_eq!(f.host.visibility_resets(), 1);
        assert_eq!(f.ledger.total_frames(), 3);
    }

    #[test]
    fn write_failure_ends_session() {
        let mut f = fixture_with(MemoryLauncher::new().fail_write_after(1), 2);
        f.manager.start_capture(&mut f.host).unwrap();
        for _ in 0..4 {
            f.host.run_frame(&mut f.manager);
        }

        // Third frame hits the broken pass 0 pipe
        assert!(!f.manager.is_capturing());
        assert_eq!(f.manager.captured_frame_count(), 2);
        assert_eq!(f.ledger.total_frames(), 2);
        assert_eq!(f.ledger.open_pipes(), 0);
        assert_eq!(f.host.software_device().live_handles(), 0);
        assert_eq!(f.host.visibility_resets(), 1);
    }

    #[test]
    fn device_failures_mid_capture_stop_once() {
        for stage in [Stage::PassEffect, Stage::StretchCopy, Stage::Download] {
            let mut f = fixture(2);
            f.manager.start_capture(&mut f.host).unwrap();
            f.host.run_frame(&mut f.manager);

            f.host.software_device().inject_fault(Some(stage));
            f.host.run_frame(&mut f.manager);
            f.host.run_frame(&mut f.manager);

            assert!(!f.manager.is_capturing(), "{stage:?}");
            assert_eq!(f.manager.captured_frame_count(), 1, "{stage:?}");
            assert_eq!(f.ledger.total_frames(), 1, "{stage:?}");
            assert_eq!(f.ledger.open_pipes(), 0, "{stage:?}");
            assert_eq!(f.host.software_device().live_handles(), 0, "{stage:?}");
            assert_eq!(f.host.visibility_resets(), 1, "{stage:?}");
        }
    }

    #[test]
    fn missing_encoder_sets_sticky_flag() {
        let mut f = fixture_with(MemoryLauncher::new().unavailable(), 2);
        let err = f.manager.start_capture(&mut f.host).unwrap_err();

        assert!(matches!(err, CaptureError::EncoderNotFound(_)));
        assert!(f.manager.encoder_not_found());
        assert!(!f.manager.is_capturing());
        assert_eq!(f.ledger.opened(), 0);
        assert_eq!(f.host.software_device().live_handles(), 0);
        assert_eq!(f.host.visibility_resets(), 1);
    }

    #[test]
    fn pipe_failure_closes_earlier_pipes() {
        let mut f = fixture_with(MemoryLauncher::new().fail_on_pass(2), 3);
        let err = f.manager.start_capture(&mut f.host).unwrap_err();

        assert!(matches!(err, CaptureError::PipeOpen { pass: 2, .. }));
        assert!(!f.manager.is_capturing());
        assert_eq!(f.ledger.opened(), 2);
        assert_eq!(f.ledger.open_pipes(), 0);
        assert_eq!(f.host.software_device().live_handles(), 0);
    }

    #[test]
    fn device_failure_at_start_rolls_back() {
        let mut f = fixture(1);
        f.host
            .software_device()
            .inject_fault(Some(Stage::CreateRenderTarget));
        let err = f.manager.start_capture(&mut f.host).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::CreateRenderTarget));
        assert!(!f.manager.is_capturing());
        assert_eq!(f.host.software_device().live_handles(), 0);
        assert_eq!(f.ledger.opened(), 0);
    }

    #[test]
    fn stops_after_end_tick() {
        let mut f = fixture(0);
        f.manager
            .update_settings(|s| {
                s.start_tick = 10;
                s.end_tick = 12;
            })
            .unwrap();
        f.manager.start_capture(&mut f.host).unwrap();

        for _ in 0..10 {
            f.host.run_frame(&mut f.manager);
        }
        // Ticks 10, 11, 12 and the first frame past the end
        assert_eq!(f.manager.captured_frame_count(), 4);
        assert!(!f.manager.is_capturing());
        assert_eq!(f.ledger.open_pipes(), 0);
    }

    #[test]
    fn rewinding_mid_tick_keeps_simulation_moving() {
        let mut f = fixture(2);
        f.manager.start_capture(&mut f.host).unwrap();
        // Pass 0 of tick 10
        f.host.run_frame(&mut f.manager);
        assert_eq!(f.host.current_tick(), 10);

        f.host.set_rewinding(true);
        for _ in 0..5 {
            f.host.run_frame(&mut f.manager);
        }
        assert!(f.manager.is_capturing());
        assert_eq!(f.manager.captured_frame_count(), 6);
        assert_eq!(f.host.current_tick(), 7);
        // Pass 1 hides the hud; its visibility is not applied while rewinding
        assert!(f.host.visible_elements().hud);

        f.host.set_rewinding(false);
        f.host.run_frame(&mut f.manager);
        assert_eq!(f.manager.captured_frame_count(), 7);
    }

    #[test]
    fn rewinding_suppresses_end_tick_stop() {
        let mut f = fixture(0);
        f.manager
            .update_settings(|s| {
                s.start_tick = 10;
                s.end_tick = 12;
            })
            .unwrap();
        f.manager.start_capture(&mut f.host).unwrap();
        for _ in 0..3 {
            f.host.run_frame(&mut f.manager);
        }
        assert_eq!(f.host.current_tick(), 13);

        f.host.set_rewinding(true);
        f.host.run_frame(&mut f.manager);
        assert!(f.manager.is_capturing());
        assert_eq!(f.manager.captured_frame_count(), 4);
        assert_eq!(f.host.current_tick(), 12);

        f.host.set_rewinding(false);
        f.host.run_frame(&mut f.manager);
        f.host.run_frame(&mut f.manager);
        assert!(!f.manager.is_capturing());
        assert_eq!(f.manager.captured_frame_count(), 6);
    }

    #[test]
    fn pre_render_applies_pass_visibility() {
        let mut f = fixture(2);
        f.manager.start_capture(&mut f.host).unwrap();

        f.manager.pre_render(&mut f.host);
        assert!(f.host.visible_elements().hud);
        f.manager.post_render(&mut f.host);

        f.manager.pre_render(&mut f.host);
        assert!(!f.host.visible_elements().hud);
        f.manager.post_render(&mut f.host);

        assert_eq!(f.host.software_device().pass_effect_count(0), 1);
        assert_eq!(f.host.software_device().pass_effect_count(1), 1);

        f.manager.stop_capture(&mut f.host);
        assert_eq!(f.host.visible_elements(), VisibleElements::default());
    }

    #[test]
    fn post_render_without_prepare_is_noop() {
        let mut f = fixture(0);
        f.manager.start_capture(&mut f.host).unwrap();
        f.manager.post_render(&mut f.host);
        assert_eq!(f.manager.captured_frame_count(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut f = fixture(1);
        f.manager.stop_capture(&mut f.host);
        f.manager.start_capture(&mut f.host).unwrap();
        f.manager.stop_capture(&mut f.host);
        f.manager.stop_capture(&mut f.host);
        assert!(!f.manager.is_capturing());
        assert_eq!(f.ledger.open_pipes(), 0);
        assert_eq!(f.host.visibility_resets(), 3);
    }

    #[test]
    fn toggle_flips_state() {
        let mut f = fixture(0);
        f.manager.toggle_capture(&mut f.host);
        assert!(f.manager.is_capturing());
        f.manager.toggle_capture(&mut f.host);
        assert!(!f.manager.is_capturing());
    }

    #[test]
    fn settings_locked_while_capturing() {
        let mut f = fixture(0);
        f.manager.start_capture(&mut f.host).unwrap();
        let err = f
            .manager
            .update_settings(|s| s.video_codec = Some(VideoCodec::Prores422))
            .unwrap_err();
        assert!(matches!(err, CaptureError::SettingsLocked));
    }

    #[test]
    fn camera_data_is_rejected_up_front() {
        let mut f = fixture(0);
        f.manager
            .update_settings(|s| s.output_format = OutputFormat::CameraData)
            .unwrap();
        let err = f.manager.start_capture(&mut f.host).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat("Camera Data")));
        assert_eq!(f.host.software_device().live_handles(), 0);
        assert_eq!(f.host.visibility_resets(), 0);
    }

    #[test]
    fn initialize_fills_defaults() {
        let mut host = DemoHost::new(Resolution::new(1920, 1080), 5000);
        let mut manager: CaptureManager<DemoHost> = CaptureManager::new(
            CaptureSettings::default(),
            Box::new(MemoryLauncher::new()),
            Box::new(TestPreferences(None)),
        );
        manager.initialize(&mut host);

        assert_eq!(host.bool_value(MULTITHREADED_RENDER_VALUE), Some(false));
        assert_eq!(
            manager.supported_resolutions(),
            &[
                Resolution::new(1920, 1080),
                Resolution::new(960, 540),
                Resolution::new(640, 360)
            ]
        );
        assert_eq!(
            manager.settings().resolution,
            Some(Resolution::new(1920, 1080))
        );
        assert_eq!((manager.settings().start_tick, manager.settings().end_tick), (500, 4500));
        assert_eq!(manager.output_directory(), default_output_directory());
        assert_eq!(host.software_device().live_handles(), 0);
    }

    #[test]
    fn initialize_survives_missing_render_value() {
        let mut host = DemoHost::new(Resolution::new(64, 32), 100);
        host.remove_config_value(MULTITHREADED_RENDER_VALUE);
        let mut manager: CaptureManager<DemoHost> = CaptureManager::new(
            CaptureSettings::default(),
            Box::new(MemoryLauncher::new()),
            Box::new(TestPreferences(None)),
        );
        manager.initialize(&mut host);

        assert_eq!(host.bool_value(MULTITHREADED_RENDER_VALUE), None);
        assert_eq!(manager.supported_resolutions().len(), SUPPORTED_RESOLUTION_COUNT);
    }

    #[test]
    fn idle_simulation_advances_normally() {
        let mut f = fixture(3);
        f.manager.start_capture(&mut f.host).unwrap();
        f.host.run_frame(&mut f.manager);
        f.manager.stop_capture(&mut f.host);
        assert_eq!(
            f.manager.simulation_advance(),
            f.manager.settings().frame_interval_ms()
        );
    }
}
