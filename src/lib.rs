pub mod capture;
pub mod encoder;
pub mod error;
pub mod host;
pub mod utils;

use std::path::{Path, PathBuf};

use arc_swap::ArcSwap;
use capture::frame::Resolution;
use capture::settings::CaptureSettings;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::host::PreferencesStore;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Prefix for environment overrides, e.g. `REELCAP__CAPTURE__END_TICK=900`
pub const ENV_PREFIX: &str = "REELCAP";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureSettings,
    pub encoder: EncoderConfig,
    pub output: OutputConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder binary; the launcher's install location when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
}

/// Synthetic recording played by the demo host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub end_tick: i32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            end_tick: 600,
        }
    }
}

impl DemoConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl EncoderConfig {
    pub fn binary(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(utils::default_encoder_path)
    }
}

impl Config {
    /// Defaults, then the TOML file if present, then `REELCAP__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, CaptureError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Preferences persisted in the global [`CONFIG`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalPreferences;

impl PreferencesStore for GlobalPreferences {
    fn output_directory(&self) -> Option<PathBuf> {
        CONFIG.load().output.directory.clone()
    }

    fn set_output_directory(&mut self, path: PathBuf) {
        CONFIG.rcu(|config| {
            let mut config = Config::clone(config);
            config.output.directory = Some(path.clone());
            config
        });
    }
}
