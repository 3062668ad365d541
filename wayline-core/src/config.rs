//! Layer configuration
//!
//! One JSON document configures the whole layer:
//!
//! ```json
//! {
//!   "trace": { "maxCoordinates": 20, "headColor": "#FF4500" },
//!   "animation": { "durationMs": 5000 },
//!   "autoTrace": true
//! }
//! ```
//!
//! Every key is optional and unknown keys are ignored.

use serde::{Deserialize, Serialize};

use crate::animation::AnimationOptions;
use crate::error::LayerError;
use crate::trails::TraceConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerConfig {
    /// Defaults for every trace started on this layer
    pub trace: TraceConfig,
    pub animation: AnimationOptions,
    /// Trace the source when a target is committed, before it starts moving
    pub auto_trace: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            trace: TraceConfig::default(),
            animation: AnimationOptions::default(),
            auto_trace: true,
        }
    }
}

impl LayerConfig {
    pub fn from_json(json: &str) -> Result<Self, LayerError> {
        let mut config: LayerConfig = serde_json::from_str(json)?;
        config.trace = config.trace.normalized();
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, LayerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
