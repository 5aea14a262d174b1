//! Movement policies for autonomous entities.
//!
//! A [`MovementPolicy`] steers one entity for one frame by writing a new
//! target position; the entity's own `tick` then applies it. Policies are
//! selected by control mode through [`policy_for`], so there is one entity
//! type and no subclassing.
//!
//! # Wandering
//!
//! [`WanderPolicy`] drives the offline filler flies:
//!
//! - a random velocity, re-rolled every 1-3 seconds
//! - a "frenzy" mode toggled every 10-22 seconds that speeds everything up
//! - bouncing off the canvas edges, gaining a little speed each time
//! - fleeing the central button
//! - occasional short full stops outside frenzy
//!
//! Velocities are expressed in pixels per nominal frame and scaled by the
//! real frame delta. Every timer is a field compared against the entity
//! clock, never a detached callback.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use swatfly_core::config::{CentralButton, EntityTuning};
//! use swatfly_core::entity::{ControlMode, Entity, EntityId};
//! use swatfly_core::movement::{policy_for, SteerContext, WanderState, WanderTuning};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(1);
//! let tuning = WanderTuning::default();
//! let mut fly = Entity::new(
//!     EntityId::new("ai-1"),
//!     ControlMode::Autonomous,
//!     Vec2::new(100.0, 100.0),
//!     EntityTuning::default(),
//! )
//! .with_wander(WanderState::new(&tuning, &mut rng));
//!
//! let policy = policy_for(fly.mode()).unwrap();
//! let mut ctx = SteerContext {
//!     canvas: Vec2::new(800.0, 600.0),
//!     button: CentralButton::default(),
//!     tuning: &tuning,
//!     rng: &mut rng,
//! };
//! policy.steer(&mut fly, 16.0, &mut ctx);
//! fly.tick(16.0);
//! assert_eq!(fly.position(), fly.target());
//! ```

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::CentralButton;
use crate::entity::{ControlMode, Entity};

/// Glyphs autonomous entities are drawn with.
pub const AUTONOMOUS_GLYPHS: [&str; 5] = ["🪰", "🦟", "🐝", "🦗", "🪳"];

// =============================================================================
// Policy Trait
// =============================================================================

/// Everything a policy may read or draw from besides the entity itself.
pub struct SteerContext<'a> {
    /// Canvas size in pixels.
    pub canvas: Vec2,
    /// The exclusion zone.
    pub button: CentralButton,
    /// Wander tunables.
    pub tuning: &'a WanderTuning,
    /// Session random source.
    pub rng: &'a mut ChaCha8Rng,
}

/// Steers an entity for one frame.
///
/// Implementations must be `Send + Sync` and hold no per-entity state; all
/// state lives on the entity.
pub trait MovementPolicy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Updates the entity's target for a frame of `dt_ms` milliseconds.
    ///
    /// Called before the entity's `tick`. Must leave dead entities alone.
    fn steer(&self, entity: &mut Entity, dt_ms: f32, ctx: &mut SteerContext<'_>);
}

static WANDER: WanderPolicy = WanderPolicy;

/// Returns the movement policy for a control mode, if it has one.
///
/// Local and remote entities are driven by input and network events, so
/// only [`ControlMode::Autonomous`] has a policy.
#[must_use]
pub fn policy_for(mode: ControlMode) -> Option<&'static dyn MovementPolicy> {
    match mode {
        ControlMode::Autonomous => Some(&WANDER),
        ControlMode::Local | ControlMode::Remote => None,
    }
}

// =============================================================================
// Wander Tuning
// =============================================================================

/// Tunables for [`WanderPolicy`]. Speeds are in pixels per nominal frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderTuning {
    /// Fraction of entities that are permanently slow.
    pub slow_fraction: f32,
    /// Speed multiplier of slow entities.
    pub slow_multiplier: f32,
    /// Lowest initial speed per axis.
    pub initial_speed_min: f32,
    /// Width of the initial speed range per axis.
    pub initial_speed_span: f32,
    /// Shortest time between direction changes.
    pub direction_change_min_ms: f32,
    /// Longest time between direction changes.
    pub direction_change_max_ms: f32,
    /// Per-axis speed bound after a calm direction change.
    pub calm_direction_amplitude: f32,
    /// Per-axis speed bound after a frenzied direction change.
    pub frenzy_direction_amplitude: f32,
    /// Shortest frenzy toggle interval.
    pub frenzy_interval_min_ms: f32,
    /// Longest frenzy toggle interval.
    pub frenzy_interval_max_ms: f32,
    /// Speed multiplier while calm.
    pub calm_speed: f32,
    /// Speed multiplier while in frenzy.
    pub frenzy_speed: f32,
    /// Fraction of the interval the frenzy timer rewinds to on calming down.
    pub calm_timer_rewind: f32,
    /// Speed gain on each edge bounce.
    pub bounce_gain: f32,
    /// Per-axis speed cap applied on bounce.
    pub max_speed: f32,
    /// Extra distance kept from the button rim while calm.
    pub calm_button_margin: f32,
    /// Extra distance kept from the button rim in frenzy.
    pub frenzy_button_margin: f32,
    /// Speed used to flee the button while calm.
    pub calm_escape_speed: f32,
    /// Speed used to flee the button in frenzy.
    pub frenzy_escape_speed: f32,
    /// Chance of pausing per `pause_window_ms` of calm movement.
    pub pause_chance: f32,
    /// Window `pause_chance` is expressed over.
    pub pause_window_ms: f32,
    /// Shortest pause.
    pub pause_min_ms: f32,
    /// Longest pause.
    pub pause_max_ms: f32,
}

impl Default for WanderTuning {
    fn default() -> Self {
        Self {
            slow_fraction: 0.3,
            slow_multiplier: 0.5,
            initial_speed_min: -1.25,
            initial_speed_span: 3.5,
            direction_change_min_ms: 1000.0,
            direction_change_max_ms: 3000.0,
            calm_direction_amplitude: 1.25,
            frenzy_direction_amplitude: 2.5,
            frenzy_interval_min_ms: 10_000.0,
            frenzy_interval_max_ms: 22_000.0,
            calm_speed: 0.7,
            frenzy_speed: 1.5,
            calm_timer_rewind: 0.8,
            bounce_gain: 1.05,
            max_speed: 5.0,
            calm_button_margin: 20.0,
            frenzy_button_margin: 40.0,
            calm_escape_speed: 2.0,
            frenzy_escape_speed: 3.5,
            pause_chance: 0.1,
            pause_window_ms: 3000.0,
            pause_min_ms: 500.0,
            pause_max_ms: 1500.0,
        }
    }
}

fn uniform(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min).max(0.0)
}

// =============================================================================
// Wander State
// =============================================================================

/// A pause in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pause {
    /// Entity clock reading at which movement resumes.
    pub until_ms: f64,
    /// Velocity restored when the pause ends.
    pub resume_velocity: Vec2,
}

/// Per-entity state of the wander policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WanderState {
    /// Current velocity in pixels per nominal frame (before the mode multiplier).
    pub velocity: Vec2,
    /// Slow entities move at a fraction of the normal speed for life.
    pub slow: bool,
    /// Whether the entity is currently in frenzy.
    pub frenzy: bool,
    direction_timer_ms: f32,
    direction_interval_ms: f32,
    frenzy_timer_ms: f32,
    frenzy_interval_ms: f32,
    pause: Option<Pause>,
}

impl WanderState {
    /// Rolls a fresh wander state.
    #[must_use]
    pub fn new(tuning: &WanderTuning, rng: &mut ChaCha8Rng) -> Self {
        let slow = rng.gen::<f32>() < tuning.slow_fraction;
        let multiplier = if slow { tuning.slow_multiplier } else { 1.0 };
        let max_speed = tuning.initial_speed_min + tuning.initial_speed_span;
        let velocity = Vec2::new(
            uniform(rng, tuning.initial_speed_min, max_speed),
            uniform(rng, tuning.initial_speed_min, max_speed),
        ) * multiplier;

        Self {
            velocity,
            slow,
            frenzy: false,
            direction_timer_ms: 0.0,
            direction_interval_ms: uniform(
                rng,
                tuning.direction_change_min_ms,
                tuning.direction_change_max_ms,
            ),
            frenzy_timer_ms: 0.0,
            frenzy_interval_ms: uniform(
                rng,
                tuning.frenzy_interval_min_ms,
                tuning.frenzy_interval_max_ms,
            ),
            pause: None,
        }
    }

    /// The pause in progress, if any.
    #[must_use]
    pub const fn pause(&self) -> Option<&Pause> {
        self.pause.as_ref()
    }

    /// Returns `true` while paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        match &mut self.pause {
            Some(pause) => pause.resume_velocity = velocity,
            None => self.velocity = velocity,
        }
    }

    fn start_pause(&mut self, now_ms: f64, duration_ms: f32) {
        if self.pause.is_some() {
            return;
        }
        self.pause = Some(Pause {
            until_ms: now_ms + f64::from(duration_ms),
            resume_velocity: self.velocity,
        });
        self.velocity = Vec2::ZERO;
    }

    fn end_pause_if_due(&mut self, now_ms: f64) {
        if let Some(pause) = self.pause {
            if now_ms >= pause.until_ms {
                self.velocity = pause.resume_velocity;
                self.pause = None;
            }
        }
    }

    fn advance_timers(&mut self, dt_ms: f32, tuning: &WanderTuning, rng: &mut ChaCha8Rng) {
        self.direction_timer_ms += dt_ms;
        if self.direction_timer_ms >= self.direction_interval_ms {
            let amplitude = if self.frenzy {
                tuning.frenzy_direction_amplitude
            } else {
                tuning.calm_direction_amplitude
            };
            let mut velocity = Vec2::new(
                uniform(rng, -amplitude, amplitude),
                uniform(rng, -amplitude, amplitude),
            );
            if self.slow {
                velocity *= tuning.slow_multiplier;
            }
            self.set_velocity(velocity);
            self.direction_timer_ms = 0.0;
        }

        self.frenzy_timer_ms += dt_ms;
        if self.frenzy_timer_ms >= self.frenzy_interval_ms {
            self.frenzy = !self.frenzy;
            self.frenzy_timer_ms = if self.frenzy {
                0.0
            } else {
                self.frenzy_interval_ms * tuning.calm_timer_rewind
            };
        }
    }
}

// =============================================================================
// Wander Policy
// =============================================================================

/// The built-in policy for autonomous entities. See the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WanderPolicy;

impl WanderPolicy {
    fn bounce(
        position: &mut Vec2,
        state: &mut WanderState,
        canvas: Vec2,
        tuning: &WanderTuning,
        rng: &mut ChaCha8Rng,
    ) {
        if position.x < 0.0 || position.x > canvas.x {
            state.velocity.x = (state.velocity.x * -tuning.bounce_gain)
                .clamp(-tuning.max_speed, tuning.max_speed);
            position.x = position.x.clamp(0.0, canvas.x);
            if state.frenzy {
                state.velocity.y += uniform(rng, -1.0, 1.0);
            }
        }

        if position.y < 0.0 || position.y > canvas.y {
            state.velocity.y = (state.velocity.y * -tuning.bounce_gain)
                .clamp(-tuning.max_speed, tuning.max_speed);
            position.y = position.y.clamp(0.0, canvas.y);
            if state.frenzy {
                state.velocity.x += uniform(rng, -1.0, 1.0);
            }
        }
    }

    fn avoid_button(
        position: Vec2,
        state: &mut WanderState,
        button: CentralButton,
        tuning: &WanderTuning,
        rng: &mut ChaCha8Rng,
    ) {
        let margin = if state.frenzy {
            tuning.frenzy_button_margin
        } else {
            tuning.calm_button_margin
        };
        let offset = position - button.center;
        if offset.length() >= button.radius + margin {
            return;
        }

        let angle = offset.y.atan2(offset.x);
        let speed = if state.frenzy {
            tuning.frenzy_escape_speed
        } else {
            tuning.calm_escape_speed
        };
        let mut escape = Vec2::from_angle(angle) * speed;
        if state.frenzy {
            escape += Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 0.5;
        }
        // Fleeing overrides a pause.
        state.pause = None;
        state.velocity = escape;
    }
}

impl MovementPolicy for WanderPolicy {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn steer(&self, entity: &mut Entity, dt_ms: f32, ctx: &mut SteerContext<'_>) {
        if !entity.is_alive() || !dt_ms.is_finite() || dt_ms <= 0.0 {
            return;
        }
        let dt_ms = dt_ms.min(entity.tuning().max_step_ms);
        let frames = dt_ms / entity.tuning().nominal_frame_ms;
        let now_ms = entity.clock_ms();
        let mut position = entity.position();

        let Some(state) = entity.wander_mut() else {
            return;
        };
        let tuning = ctx.tuning;

        state.end_pause_if_due(now_ms);
        state.advance_timers(dt_ms, tuning, ctx.rng);

        let speed = if state.frenzy {
            tuning.frenzy_speed
        } else {
            tuning.calm_speed
        };
        position += state.velocity * speed * frames;

        if !state.frenzy
            && ctx.rng.gen::<f32>() < tuning.pause_chance * (dt_ms / tuning.pause_window_ms)
        {
            let duration = uniform(ctx.rng, tuning.pause_min_ms, tuning.pause_max_ms);
            state.start_pause(now_ms, duration);
        }

        Self::bounce(&mut position, state, ctx.canvas, tuning, ctx.rng);
        Self::avoid_button(position, state, ctx.button, tuning, ctx.rng);

        if state.is_paused() {
            trace!(policy = self.name(), "paused");
        }
        entity.set_target(position);
    }
}

// =============================================================================
// Tests
// =============================================================================
