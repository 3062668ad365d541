//! Trace configuration
//!
//! `TraceConfig` holds the resolved values, `TraceOptions` the optional
//! per-call overrides merged on top of an engine's defaults.

use serde::{Deserialize, Serialize};

use crate::style::Rgb;

/// Resolved trace configuration.
///
/// Deserializes from camelCase JSON; unknown keys are ignored and missing keys
/// take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraceConfig {
    /// Maximum number of live points per trace
    pub max_coordinates: usize,
    /// Age in ms at which a point has fully faded out
    pub coordinate_lifetime: u64,
    /// Fade-in time of a new point in ms
    pub fade_in_duration: u64,
    /// Fade-out time of an expiring point in ms
    pub fade_out_duration: u64,
    /// Base point diameter in pixels
    pub trace_point_size: f64,
    pub tail_color: Rgb,
    pub head_color: Rgb,
    pub tail_alpha: f64,
    pub head_alpha: f64,
    pub tail_size_ratio: f64,
    pub head_size_ratio: f64,
    /// Meters the entity must move before a new point is recorded...
    pub min_point_distance: f64,
    /// ...unless this many ms have passed since the last point
    pub min_point_interval: u64,
    pub removal_interval_min: u64,
    pub removal_interval_max: u64,
    /// Point count at or above which expired points go at the fastest cadence
    pub removal_slowdown_threshold: u32,
    pub removal_slowdown_power: f64,
    /// Minimum ms between restyle passes
    pub color_update_interval: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_coordinates: 10,
            coordinate_lifetime: 60_000,
            fade_in_duration: 300,
            fade_out_duration: 500,
            trace_point_size: 5.0,
            tail_color: Rgb::new(0x1E, 0x90, 0xFF),
            head_color: Rgb::new(0xFF, 0xD7, 0x00),
            tail_alpha: 0.04,
            head_alpha: 0.12,
            tail_size_ratio: 0.1,
            head_size_ratio: 1.0,
            min_point_distance: 500.0,
            min_point_interval: 5_000,
            removal_interval_min: 100,
            removal_interval_max: 2_500,
            removal_slowdown_threshold: 20,
            removal_slowdown_power: 2.0,
            color_update_interval: 100,
        }
    }
}

impl TraceConfig {
    /// Parse from JSON, falling back to defaults for missing keys
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<TraceConfig>(json).map(TraceConfig::normalized)
    }

    /// Apply `options` on top of `self`
    pub fn merged(&self, options: &TraceOptions) -> TraceConfig {
        TraceConfig {
            max_coordinates: options.max_coordinates.unwrap_or(self.max_coordinates),
            coordinate_lifetime: options
                .coordinate_lifetime
                .unwrap_or(self.coordinate_lifetime),
            fade_in_duration: options.fade_in_duration.unwrap_or(self.fade_in_duration),
            fade_out_duration: options.fade_out_duration.unwrap_or(self.fade_out_duration),
            trace_point_size: options.trace_point_size.unwrap_or(self.trace_point_size),
            tail_color: options.tail_color.unwrap_or(self.tail_color),
            head_color: options.head_color.unwrap_or(self.head_color),
            tail_alpha: options.tail_alpha.unwrap_or(self.tail_alpha),
            head_alpha: options.head_alpha.unwrap_or(self.head_alpha),
            tail_size_ratio: options.tail_size_ratio.unwrap_or(self.tail_size_ratio),
            head_size_ratio: options.head_size_ratio.unwrap_or(self.head_size_ratio),
            min_point_distance: options.min_point_distance.unwrap_or(self.min_point_distance),
            min_point_interval: options.min_point_interval.unwrap_or(self.min_point_interval),
            removal_interval_min: options
                .removal_interval_min
                .unwrap_or(self.removal_interval_min),
            removal_interval_max: options
                .removal_interval_max
                .unwrap_or(self.removal_interval_max),
            removal_slowdown_threshold: options
                .removal_slowdown_threshold
                .unwrap_or(self.removal_slowdown_threshold),
            removal_slowdown_power: options
                .removal_slowdown_power
                .unwrap_or(self.removal_slowdown_power),
            color_update_interval: options
                .color_update_interval
                .unwrap_or(self.color_update_interval),
        }
        .normalized()
    }

    /// Clamp values that would break the engine's arithmetic
    pub fn normalized(mut self) -> TraceConfig {
        self.max_coordinates = self.max_coordinates.max(1);
        self.fade_out_duration = self.fade_out_duration.min(self.coordinate_lifetime);
        self.removal_interval_max = self.removal_interval_max.max(self.removal_interval_min);
        self.removal_slowdown_power = self.removal_slowdown_power.max(0.0);
        self
    }
}

/// Per-call overrides for [`TraceConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_coordinates: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate_lifetime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_in_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_out_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_point_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_size_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_size_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_point_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_point_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_interval_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_interval_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_slowdown_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_slowdown_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_update_interval: Option<u64>,
}

impl TraceOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
