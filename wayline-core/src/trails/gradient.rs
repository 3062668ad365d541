//! Trail appearance and removal cadence
//!
//! The gradient is index based: the oldest live point (index 0) gets the tail
//! parameters, the newest the head parameters. Indices shift on every eviction,
//! so styles must be recomputed from the current index, never cached from the
//! point's birth.

use super::config::TraceConfig;
use super::history::TraceCoordinate;
use crate::geo::lerp;
use crate::style::PointStyle;

/// Gradient position of `index` in a trace of `len` points. A single point is
/// all head.
pub fn gradient_position(index: usize, len: usize) -> f64 {
    if len <= 1 {
        1.0
    } else {
        (index.min(len - 1)) as f64 / (len - 1) as f64
    }
}

/// Un-faded style of the point at `index` in a trace of `len` points
pub fn gradient_style(config: &TraceConfig, index: usize, len: usize) -> PointStyle {
    let t = gradient_position(index, len);
    let base = config.trace_point_size;
    PointStyle {
        color: config.tail_color.lerp(&config.head_color, t),
        alpha: lerp(config.tail_alpha, config.head_alpha, t),
        pixel_size: lerp(base * config.tail_size_ratio, base * config.head_size_ratio, t),
    }
}

/// Opacity multiplier from fade-in and fade-out at time `now_ms`
pub fn fade_factor(config: &TraceConfig, coordinate: &TraceCoordinate, now_ms: u64) -> f64 {
    let age = now_ms.saturating_sub(coordinate.timestamp_created);
    let fade_in = if config.fade_in_duration == 0 {
        1.0
    } else {
        (age as f64 / config.fade_in_duration as f64).min(1.0)
    };
    let fade_out = match coordinate.fade_out_started {
        None => 1.0,
        Some(_) if config.fade_out_duration == 0 => 0.0,
        Some(started) => {
            let elapsed = now_ms.saturating_sub(started) as f64;
            (1.0 - elapsed / config.fade_out_duration as f64).max(0.0)
        }
    };
    fade_in * fade_out
}

/// Delay in ms before the next expired point is removed, given how many points
/// remain. Fewer points means a slower cadence, so a trail tails off instead of
/// vanishing at once.
pub fn removal_interval(config: &TraceConfig, remaining: usize) -> u64 {
    let min = config.removal_interval_min as f64;
    let max = config.removal_interval_max.max(config.removal_interval_min) as f64;
    let ratio = if config.removal_slowdown_threshold == 0 {
        0.0
    } else {
        (1.0 - remaining as f64 / config.removal_slowdown_threshold as f64).clamp(0.0, 1.0)
    };
    let power = config.removal_slowdown_power.max(0.0);
    (min + (max - min) * ratio.powf(power)).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Position;
    use crate::host::EntityId;
    use crate::style::Rgb;
    use crate::trails::history::PointId;

    fn config() -> TraceConfig {
        TraceConfig {
            tail_color: Rgb::new(0, 0, 0),
            head_color: Rgb::new(200, 100, 50),
            tail_alpha: 0.0,
            head_alpha: 1.0,
            trace_point_size: 10.0,
            tail_size_ratio: 0.0,
            head_size_ratio: 1.0,
            ..Default::default()
        }
    }

    fn coordinate(created: u64, fade_out_started: Option<u64>) -> TraceCoordinate {
        TraceCoordinate {
            id: PointId(1),
            marker: EntityId::new("m"),
            position: Position::default(),
            timestamp_created: created,
            birth_index: 0,
            fade_out_started,
        }
    }

    #[test]
    fn test_gradient_position() {
        assert_eq!(gradient_position(0, 1), 1.0);
        assert_eq!(gradient_position(0, 5), 0.0);
        assert_eq!(gradient_position(2, 5), 0.5);
        assert_eq!(gradient_position(4, 5), 1.0);
    }

    #[test]
    fn test_gradient_interpolates_tail_to_head() {
        let config = config();
        let tail = gradient_style(&config, 0, 3);
        assert_eq!(tail.color, Rgb::new(0, 0, 0));
        assert_eq!(tail.alpha, 0.0);
        assert_eq!(tail.pixel_size, 0.0);

        let mid = gradient_style(&config, 1, 3);
        assert_eq!(mid.color, Rgb::new(100, 50, 25));
        assert_eq!(mid.alpha, 0.5);
        assert_eq!(mid.pixel_size, 5.0);

        let head = gradient_style(&config, 2, 3);
        assert_eq!(head.color, Rgb::new(200, 100, 50));
        assert_eq!(head.alpha, 1.0);
        assert_eq!(head.pixel_size, 10.0);
    }

    #[test]
    fn test_single_point_uses_head() {
        let config = config();
        assert_eq!(gradient_style(&config, 0, 1), gradient_style(&config, 4, 5));
    }

    #[test]
    fn test_fade_factor() {
        let config = TraceConfig {
            fade_in_duration: 300,
            fade_out_duration: 500,
            ..Default::default()
        };
        assert_eq!(fade_factor(&config, &coordinate(1000, None), 1000), 0.0);
        assert_eq!(fade_factor(&config, &coordinate(1000, None), 1150), 0.5);
        assert_eq!(fade_factor(&config, &coordinate(1000, None), 5000), 1.0);
        assert_eq!(fade_factor(&config, &coordinate(0, Some(4000)), 4250), 0.5);
        assert_eq!(fade_factor(&config, &coordinate(0, Some(4000)), 4600), 0.0);
    }

    #[test]
    fn test_removal_interval_slows_as_trace_shrinks() {
        let config = TraceConfig::default();
        assert_eq!(removal_interval(&config, 20), 100);
        assert_eq!(removal_interval(&config, 40), 100);
        assert_eq!(removal_interval(&config, 10), 700);
        assert_eq!(removal_interval(&config, 0), 2_500);
        assert!(removal_interval(&config, 2) > removal_interval(&config, 5));
    }

    #[test]
    fn test_removal_interval_bounded_for_negative_power() {
        let config = TraceConfig {
            removal_slowdown_power: -2.0,
            ..Default::default()
        };
        for remaining in [0, 5, 20, 40] {
            let interval = removal_interval(&config, remaining);
            assert!(interval <= config.removal_interval_max, "{}ms", interval);
        }
    }
}
