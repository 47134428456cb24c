use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::ROTATION_MAX_UNITS;

/// Decode parameters as an external parameter source supplies them.
/// Angles use mathematical convention in radians; the conversion to
/// hardware rotation codes happens when the snapshot is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderOptions {
    /// Shortest accepted corrected distance in meters.
    pub min_range: f32,
    /// Longest accepted corrected distance in meters.
    pub max_range: f32,
    /// Center of the horizontal view in radians.
    pub view_direction: f64,
    /// Angular width of the horizontal view in radians.
    pub view_width: f64,
    /// Frame the output cloud should be expressed in; `None` keeps the
    /// capture frame and skips transformation entirely.
    #[serde(default)]
    pub target_frame: Option<String>,
    /// Intermediate frame for time-travelling transform lookups.
    #[serde(default)]
    pub fixed_frame: Option<String>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            min_range: 0.9,
            max_range: 130.,
            view_direction: 0.,
            view_width: TAU,
            target_frame: None,
            fixed_frame: None,
        }
    }
}

/// Immutable per-scan snapshot derived from [`DecoderOptions`]. The
/// decoder clones one at the start of every scan, so a concurrent
/// parameter update never tears a min/max pair mid-decode.
#[derive(Debug, Clone)]
pub(crate) struct DecoderConfig {
    pub min_range: f32,
    pub max_range: f32,
    /// Azimuth window edges as hardware rotation codes. `min > max`
    /// denotes a window wrapping through the zero code.
    pub min_angle: u16,
    pub max_angle: u16,
    pub target_frame: Option<String>,
    pub fixed_frame: Option<String>,
}

impl From<&DecoderOptions> for DecoderConfig {
    fn from(options: &DecoderOptions) -> Self {
        // Window edges in the sensor's own convention: wrap into
        // [0, 2pi), then map to codes, which run opposite to the
        // mathematical angle. Adding 0.5 centers the truncation.
        let wrap = |angle: f64| angle.rem_euclid(TAU);
        let to_code =
            |angle: f64| (100. * (TAU - angle).to_degrees() + 0.5) as u16;

        let mut min_angle = to_code(wrap(options.view_direction + options.view_width / 2.));
        let mut max_angle = to_code(wrap(options.view_direction - options.view_width / 2.));
        if min_angle == max_angle {
            // A degenerate window means the full circle, not an empty one.
            min_angle = 0;
            max_angle = ROTATION_MAX_UNITS as u16;
        }

        Self {
            min_range: options.min_range,
            max_range: options.max_range,
            min_angle,
            max_angle,
            target_frame: options.target_frame.clone(),
            fixed_frame: options.fixed_frame.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_view_normalizes_to_full_circle() {
        let config = DecoderConfig::from(&DecoderOptions::default());
        assert_eq!(0, config.min_angle);
        assert_eq!(36000, config.max_angle);
    }

    #[test]
    fn narrow_forward_view_wraps() {
        // 8 degrees centered on the mathematical zero direction: the
        // hardware window wraps through code zero.
        let options = DecoderOptions {
            view_direction: 0.,
            view_width: 8f64.to_radians(),
            ..Default::default()
        };
        let config = DecoderConfig::from(&options);
        assert_eq!(35600, config.min_angle);
        assert_eq!(400, config.max_angle);
        assert!(config.min_angle > config.max_angle);
    }

    #[test]
    fn offset_view_keeps_order() {
        let options = DecoderOptions {
            view_direction: 180f64.to_radians(),
            view_width: 90f64.to_radians(),
            ..Default::default()
        };
        let config = DecoderConfig::from(&options);
        assert_eq!(13500, config.min_angle);
        assert_eq!(22500, config.max_angle);
    }

    #[test]
    fn options_deserialize_with_optional_frames() {
        let options: DecoderOptions = serde_json::from_str(
            r#"{"min_range": 0.4, "max_range": 100.0,
                "view_direction": 0.0, "view_width": 6.283185307179586}"#,
        )
        .unwrap();
        assert_eq!(None, options.target_frame);
        assert_eq!(None, options.fixed_frame);
        assert_eq!(0.4, options.min_range);
    }
}
