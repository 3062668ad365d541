//! Configuration file loading

use std::path::Path;

use wayline_core::LayerConfig;

/// Load the layer configuration from `path`.
///
/// A missing path means defaults. An unreadable or malformed file is logged
/// and also falls back to defaults, so a bad file never stops the simulator.
pub fn load_config(path: Option<&Path>) -> LayerConfig {
    let Some(path) = path else {
        log::debug!("No config file given, using defaults");
        return LayerConfig::default();
    };
    match std::fs::read_to_string(path) {
        Ok(json) => match LayerConfig::from_json(&json) {
            Ok(config) => {
                log::debug!("Loaded config from {}: {:?}", path.display(), config);
                config
            }
            Err(e) => {
                log::warn!("Failed to parse {}, using defaults: {}", path.display(), e);
                LayerConfig::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read {}, using defaults: {}", path.display(), e);
            LayerConfig::default()
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub duration_ms: Option<u64>,
    pub stopping_distance: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut LayerConfig) {
        if let Some(duration_ms) = self.duration_ms {
            config.animation.duration_ms = duration_ms;
        }
        if let Some(stopping_distance) = self.stopping_distance {
            config.animation.stopping_distance_meters = stopping_distance;
        }
    }
}
