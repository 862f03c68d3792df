//! Runtime cable configuration loaded from `assets/cable.toml`.
//!
//! [`CableConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_cable_config`] reads
//! `assets/cable.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `CableConfig::default()`.

use crate::constants::*;
use crate::error::{validate_period, validate_positive, CableResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Path of the optional override file, relative to the working directory.
pub const CABLE_CONFIG_PATH: &str = "assets/cable.toml";

/// Runtime-tunable cable, connector, and holding configuration.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CableConfig {
    // ── Geometry ─────────────────────────────────────────────────────────────
    pub segment_count: usize,
    pub segment_spacing: f32,
    pub segment_thickness: f32,

    // ── Springs ──────────────────────────────────────────────────────────────
    pub spring_stiffness: f32,
    pub spring_damping: f32,
    pub point_linear_damping: f32,
    pub point_angular_damping: f32,

    // ── Breaking ─────────────────────────────────────────────────────────────
    pub break_length_multiplier: f32,
    pub break_slack: f32,
    pub min_break_secs: f32,

    // ── Connector feedback ───────────────────────────────────────────────────
    pub mismatch_period_min: f32,
    pub mismatch_period_max: f32,
    pub mismatch_rng_seed: u64,
    pub snap_out_offset: f32,

    // ── Holding ──────────────────────────────────────────────────────────────
    pub follow_frequency_hz: f32,
    pub holding_gain: f32,
    pub max_held_pitch_deg: f32,
    pub held_layer: u32,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            segment_count: DEFAULT_SEGMENT_COUNT,
            segment_spacing: SEGMENT_SPACING,
            segment_thickness: SEGMENT_THICKNESS,
            spring_stiffness: SPRING_STIFFNESS,
            spring_damping: SPRING_DAMPING,
            point_linear_damping: POINT_LINEAR_DAMPING,
            point_angular_damping: POINT_ANGULAR_DAMPING,
            break_length_multiplier: BREAK_LENGTH_MULTIPLIER,
            break_slack: BREAK_SLACK,
            min_break_secs: MIN_BREAK_SECS,
            mismatch_period_min: MISMATCH_PERIOD_MIN,
            mismatch_period_max: MISMATCH_PERIOD_MAX,
            mismatch_rng_seed: MISMATCH_RNG_SEED,
            snap_out_offset: SNAP_OUT_OFFSET,
            follow_frequency_hz: FOLLOW_FREQUENCY_HZ,
            holding_gain: HOLDING_GAIN,
            max_held_pitch_deg: MAX_HELD_PITCH_DEG,
            held_layer: HELD_LAYER,
        }
    }
}

impl CableConfig {
    /// Check every value that would make the simulation misbehave.
    pub fn validate(&self) -> CableResult<()> {
        if self.segment_count == 0 {
            return Err(crate::error::CableError::InvalidConfig {
                name: "segment_count",
                value: 0.0,
                safe_range: "[1, ∞)",
            });
        }
        if self.held_layer >= LAYER_COUNT {
            return Err(crate::error::CableError::InvalidConfig {
                name: "held_layer",
                value: self.held_layer as f32,
                safe_range: "[0, 31]",
            });
        }
        validate_positive("segment_spacing", self.segment_spacing)?;
        validate_positive("segment_thickness", self.segment_thickness)?;
        validate_positive("spring_stiffness", self.spring_stiffness)?;
        validate_positive("break_length_multiplier", self.break_length_multiplier)?;
        validate_positive("min_break_secs", self.min_break_secs)?;
        validate_positive("follow_frequency_hz", self.follow_frequency_hz)?;
        validate_period(self.mismatch_period_min, self.mismatch_period_max)
    }

    /// Break threshold for a chain of `segment_count` points.
    ///
    /// `spacing × segment_count × multiplier + slack`, tying tolerance to the
    /// authored geometry.
    pub fn break_length(&self, segment_count: usize) -> f32 {
        self.segment_spacing * segment_count as f32 * self.break_length_multiplier
            + self.break_slack
    }
}

/// Parse a TOML override document.  Keys not present keep their defaults.
pub fn parse_cable_config(contents: &str) -> Result<CableConfig, toml::de::Error> {
    toml::from_str::<CableConfig>(contents)
}

/// Startup system: attempt to load `assets/cable.toml` and overwrite the
/// `CableConfig` resource with any values present in the file.
///
/// TOML parse errors and out-of-range values are logged but do not abort the
/// app.  A missing file is not an error (defaults are already in place).
pub fn load_cable_config(mut config: ResMut<CableConfig>) {
    let path = CABLE_CONFIG_PATH;
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_cable_config(&contents) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => {
                    *config = loaded;
                    info!("Loaded cable config from {path}");
                }
                Err(e) => warn!("Rejected {path}: {e}; using defaults"),
            },
            Err(e) => {
                warn!("Failed to parse {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            debug!("No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CableConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = parse_cable_config("segment_spacing = 0.5\nmin_break_secs = 2.0\n")
            .expect("partial config must parse");
        assert_eq!(cfg.segment_spacing, 0.5);
        assert_eq!(cfg.min_break_secs, 2.0);
        assert_eq!(cfg.segment_count, DEFAULT_SEGMENT_COUNT);
        assert_eq!(cfg.spring_stiffness, SPRING_STIFFNESS);
    }

    #[test]
    fn break_length_scales_with_geometry() {
        let cfg = CableConfig::default();
        // 0.3 × 3 × 2.0 + 2.0
        assert!((cfg.break_length(3) - 3.8).abs() < 1e-5);
        assert!(cfg.break_length(10) > cfg.break_length(3));
    }

    #[test]
    fn zero_segments_are_rejected() {
        let cfg = CableConfig {
            segment_count: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn held_layer_must_fit_group_mask() {
        let cfg = CableConfig {
            held_layer: 32,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = CableConfig {
            held_layer: 31,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
