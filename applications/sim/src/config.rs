/// Feed configuration loading
use crate::error::{Result, SimError};
use reel_playback::{FeedConfig, TriggerMode};
use std::path::{Path, PathBuf};

/// Loaded when no `--config` is given and the file exists
pub const DEFAULT_CONFIG_FILE: &str = "reel.toml";

/// Environment prefix, e.g. `REEL_MIN_FRACTION=0.7`
pub const ENV_PREFIX: &str = "REEL";

/// Load configuration from file and environment
///
/// An explicit `path` must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<FeedConfig> {
    let mut settings = config::Config::builder();

    match path {
        Some(path) => {
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                settings = settings.add_source(config::File::from(default_path));
            }
        }
    }

    // Fields are flat, so only a double underscore nests
    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = settings
        .build()
        .map_err(|e| SimError::Config(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| SimError::Config(e.to_string()))
}

/// Command-line overrides, applied after file and environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub min_fraction: Option<f64>,
    pub hysteresis_margin: Option<f64>,
    pub viewport_height: Option<f64>,
    pub muted: Option<bool>,
    pub trigger: Option<TriggerMode>,
    pub poll_interval_ms: Option<u64>,
}

impl Overrides {
    /// Apply the overrides and validate the result
    pub fn apply(self, mut config: FeedConfig) -> Result<FeedConfig> {
        if let Some(min_fraction) = self.min_fraction {
            config.min_fraction = min_fraction;
        }
        if let Some(margin) = self.hysteresis_margin {
            config.hysteresis_margin = margin;
        }
        if let Some(height) = self.viewport_height {
            config.viewport_height = height;
        }
        if let Some(muted) = self.muted {
            config.default_muted = muted;
        }
        if let Some(trigger) = self.trigger {
            config.trigger = trigger;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }

        config.validate()?;
        Ok(config)
    }
}
