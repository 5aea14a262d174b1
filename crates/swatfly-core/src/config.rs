//! Game configuration and policy values.
//!
//! Every tunable the client core uses lives in [`GameConfig`]. The defaults
//! match the shipped game; a host may override any subset by loading a JSON
//! document (missing fields fall back to their defaults).
//!
//! # Example
//!
//! ```
//! use swatfly_core::config::GameConfig;
//!
//! let config = GameConfig::from_json_str(r#"{ "seed": 7, "entity": { "teleport_threshold": 80.0 } }"#)
//!     .unwrap();
//!
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.entity.teleport_threshold, 80.0);
//! assert_eq!(config.entity.corpse_window_ms, 2000.0);
//! ```

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::link::ReconnectPolicy;
use crate::movement::WanderTuning;

// =============================================================================
// Entity Tuning
// =============================================================================

/// Per-entity policy values.
///
/// Every [`Entity`](crate::entity::Entity) carries a copy of this struct so
/// that its operations stay total and need no outside context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityTuning {
    /// Visual radius of an avatar in pixels.
    pub radius: f32,
    /// Multiplier applied to `radius` for click hit-testing.
    pub hit_radius_scale: f32,
    /// Distance beyond which a remote entity snaps instead of interpolating.
    pub teleport_threshold: f32,
    /// Interpolation rate of the local entity (per nominal frame).
    pub local_smoothing: f32,
    /// Resting interpolation rate of remote entities (per nominal frame).
    pub remote_smoothing: f32,
    /// Boosted interpolation rate right after a remote position update.
    pub catch_up_smoothing: f32,
    /// How long the catch-up boost lasts, in milliseconds.
    pub catch_up_window_ms: f32,
    /// How long a corpse stays visible after death, in milliseconds.
    pub corpse_window_ms: f32,
    /// Duration of one nominal frame in milliseconds.
    pub nominal_frame_ms: f32,
    /// Largest step a single `tick` will integrate, in milliseconds.
    pub max_step_ms: f32,
    /// Pulse phase advance per nominal frame (radians).
    pub pulse_speed: f32,
    /// Relative pulse amplitude.
    pub pulse_amount: f32,
    /// Rotation advance per nominal frame for the local entity (radians).
    pub local_rotation_speed: f32,
    /// Rotation advance per nominal frame for other entities (radians).
    pub remote_rotation_speed: f32,
}

impl Default for EntityTuning {
    fn default() -> Self {
        Self {
            radius: 20.0,
            hit_radius_scale: 1.5,
            teleport_threshold: 100.0,
            local_smoothing: 0.5,
            remote_smoothing: 0.1,
            catch_up_smoothing: 0.25,
            catch_up_window_ms: 250.0,
            corpse_window_ms: 2000.0,
            nominal_frame_ms: 16.0,
            max_step_ms: 250.0,
            pulse_speed: 0.05,
            pulse_amount: 0.1,
            local_rotation_speed: 0.01,
            remote_rotation_speed: 0.03,
        }
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Session-level timing policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delta substituted for the very first frame, in milliseconds.
    pub first_frame_ms: f32,
    /// Frame deltas above this are clamped, in milliseconds.
    pub max_frame_ms: f32,
    /// Minimum interval between outbound position updates.
    pub position_send_interval_ms: f32,
    /// Clicks closer together than this are ignored.
    pub click_cooldown_ms: f32,
    /// Offline respawn delay after a death.
    pub respawn_delay_ms: f32,
    /// Keep-alive ping interval while connected.
    pub ping_interval_ms: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            first_frame_ms: 16.0,
            max_frame_ms: 250.0,
            position_send_interval_ms: 25.0,
            click_cooldown_ms: 100.0,
            respawn_delay_ms: 5000.0,
            ping_interval_ms: 15_000.0,
        }
    }
}

// =============================================================================
// Central Button
// =============================================================================

/// The circular "central action" button in the middle of the playfield.
///
/// Clicking it is a special action, and autonomous entities treat it as an
/// exclusion zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralButton {
    /// Centre of the button in canvas pixels.
    pub center: Vec2,
    /// Radius of the button in pixels.
    pub radius: f32,
}

impl CentralButton {
    /// Returns `true` if `point` lies on the button.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }
}

impl Default for CentralButton {
    fn default() -> Self {
        Self {
            center: Vec2::new(640.0, 360.0),
            radius: 75.0,
        }
    }
}

// =============================================================================
// Autonomous Population
// =============================================================================

/// Offline-mode population of autonomous entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomousConfig {
    /// Number of autonomous entities spawned in offline mode.
    pub count: usize,
    /// Minimum distance from the canvas edges and the button rim when spawning.
    pub spawn_margin: f32,
    /// Chance per frame that a hidden autonomous entity respawns early.
    pub respawn_chance_per_frame: f64,
    /// Movement tunables.
    pub wander: WanderTuning,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            count: 5,
            spawn_margin: 50.0,
            respawn_chance_per_frame: 0.005,
            wander: WanderTuning::default(),
        }
    }
}

// =============================================================================
// Game Config
// =============================================================================

/// Complete configuration for a client session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Canvas size in pixels.
    pub canvas: Vec2,
    /// Central action button.
    pub central_button: CentralButton,
    /// Per-entity policy values.
    pub entity: EntityTuning,
    /// Session timing policy.
    pub timing: TimingConfig,
    /// Offline-mode population.
    pub autonomous: AutonomousConfig,
    /// Transport reconnection policy.
    pub reconnect: ReconnectPolicy,
    /// Seed for every random draw the session makes.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            canvas: Vec2::new(1280.0, 720.0),
            central_button: CentralButton::default(),
            entity: EntityTuning::default(),
            timing: TimingConfig::default(),
            autonomous: AutonomousConfig::default(),
            reconnect: ReconnectPolicy::default(),
            seed: 0,
        }
    }
}

impl GameConfig {
    /// Returns a config for a canvas of the given size, with the central
    /// button re-centred on it.
    #[must_use]
    pub fn with_canvas(width: f32, height: f32) -> Self {
        let canvas = Vec2::new(width, height);
        Self {
            canvas,
            central_button: CentralButton {
                center: canvas * 0.5,
                ..CentralButton::default()
            },
            ..Self::default()
        }
    }

    /// Returns a copy with the given seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parses and validates a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when a policy value is out of range.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`GameConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks that every policy value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive finite number, got {value}"),
                })
            }
        }

        fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a non-negative finite number, got {value}"),
                })
            }
        }

        fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must lie in [0, 1], got {value}"),
                })
            }
        }

        positive("canvas.x", self.canvas.x)?;
        positive("canvas.y", self.canvas.y)?;
        positive("entity.radius", self.entity.radius)?;
        positive("entity.hit_radius_scale", self.entity.hit_radius_scale)?;
        positive("entity.teleport_threshold", self.entity.teleport_threshold)?;
        positive("entity.nominal_frame_ms", self.entity.nominal_frame_ms)?;
        positive("entity.max_step_ms", self.entity.max_step_ms)?;
        positive("entity.corpse_window_ms", self.entity.corpse_window_ms)?;
        non_negative("entity.catch_up_window_ms", self.entity.catch_up_window_ms)?;
        unit("entity.local_smoothing", self.entity.local_smoothing)?;
        unit("entity.remote_smoothing", self.entity.remote_smoothing)?;
        unit("entity.catch_up_smoothing", self.entity.catch_up_smoothing)?;
        positive("timing.first_frame_ms", self.timing.first_frame_ms)?;
        positive("timing.max_frame_ms", self.timing.max_frame_ms)?;
        non_negative("timing.position_send_interval_ms", self.timing.position_send_interval_ms)?;
        non_negative("timing.click_cooldown_ms", self.timing.click_cooldown_ms)?;
        non_negative("timing.respawn_delay_ms", self.timing.respawn_delay_ms)?;
        positive("timing.ping_interval_ms", self.timing.ping_interval_ms)?;
        non_negative("autonomous.spawn_margin", self.autonomous.spawn_margin)?;
        non_negative("reconnect.base_delay_ms", self.reconnect.base_delay_ms)?;

        if !(0.0..=1.0).contains(&self.autonomous.respawn_chance_per_frame) {
            return Err(ConfigError::Invalid {
                field: "autonomous.respawn_chance_per_frame",
                reason: "must lie in [0, 1]".to_owned(),
            });
        }
        if !(self.reconnect.factor.is_finite() && self.reconnect.factor >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "reconnect.factor",
                reason: format!("must be at least 1.0, got {}", self.reconnect.factor),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn with_canvas_recentres_button() {
        let config = GameConfig::with_canvas(800.0, 600.0);
        assert_eq!(config.canvas, Vec2::new(800.0, 600.0));
        assert_eq!(config.central_button.center, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "timing": { "click_cooldown_ms": 50.0 } }"#)
            .unwrap();
        assert_eq!(config.timing.click_cooldown_ms, 50.0);
        assert_eq!(config.timing.position_send_interval_ms, 25.0);
        assert_eq!(config.entity, EntityTuning::default());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_smoothing_is_rejected() {
        let err = GameConfig::from_json_str(r#"{ "entity": { "local_smoothing": 1.5 } }"#)
            .unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "entity.local_smoothing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_timings_are_rejected() {
        let cases = [
            (r#"{ "timing": { "respawn_delay_ms": -1.0 } }"#, "timing.respawn_delay_ms"),
            (r#"{ "timing": { "click_cooldown_ms": -5.0 } }"#, "timing.click_cooldown_ms"),
            (r#"{ "timing": { "ping_interval_ms": 0.0 } }"#, "timing.ping_interval_ms"),
            (r#"{ "reconnect": { "base_delay_ms": -2000.0 } }"#, "reconnect.base_delay_ms"),
            (r#"{ "entity": { "catch_up_window_ms": -1.0 } }"#, "entity.catch_up_window_ms"),
        ];
        for (json, expected) in cases {
            match GameConfig::from_json_str(json).unwrap_err() {
                ConfigError::Invalid { field, .. } => assert_eq!(field, expected),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = GameConfig::default();
        config.timing.position_send_interval_ms = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.reconnect.factor = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GameConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn central_button_contains_rim() {
        let button = CentralButton {
            center: Vec2::ZERO,
            radius: 10.0,
        };
        assert!(button.contains(Vec2::new(10.0, 0.0)));
        assert!(!button.contains(Vec2::new(10.5, 0.0)));
    }

    #[test]
    fn serialization_roundtrip() {
        let config = GameConfig::with_canvas(1024.0, 768.0).with_seed(99);
        let json = serde_json::to_string(&config).unwrap();
        let back = GameConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
