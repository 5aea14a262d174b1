//! Entity module: the movable, killable avatars of the game.
//!
//! This module provides the core entity types:
//! - [`EntityId`]: Opaque server- or locally-assigned identity
//! - [`ControlMode`]: Who drives the entity (input, network, or built-in AI)
//! - [`LifeState`]: Alive, dying (corpse visible) or hidden
//! - [`Entity`]: The complete entity
//!
//! # Life cycle
//!
//! ```text
//! alive --kill--> dying --corpse window elapses--> hidden --respawn--> alive
//!                   |                                                  ^
//!                   +--------------------respawn-----------------------+
//! ```
//!
//! The corpse window is not a timer owned by anyone: `kill` records a
//! pending hide stamped with the entity's life generation, and `tick`
//! applies it only if the generation still matches. A respawn bumps the
//! generation, so a stale hide can never clobber it.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use swatfly_core::config::EntityTuning;
//! use swatfly_core::entity::{ControlMode, Entity, EntityId, LifeState};
//!
//! let mut fly = Entity::new(
//!     EntityId::new("p2"),
//!     ControlMode::Remote,
//!     Vec2::new(50.0, 50.0),
//!     EntityTuning::default(),
//! );
//!
//! assert!(fly.hit_test(Vec2::new(60.0, 50.0)));
//! fly.kill(None);
//! assert_eq!(fly.life(), LifeState::Dying);
//! assert!(!fly.hit_test(Vec2::new(50.0, 50.0)));
//! ```

pub mod appearance;

use std::f32::consts::TAU;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::EntityTuning;
use crate::movement::WanderState;
use crate::notice::DeathNotice;

pub use appearance::{Appearance, AppearancePatch, ColorPair};

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier for an entity.
///
/// Identities are opaque strings assigned by the server, or generated
/// locally in offline mode. They are unique within a
/// [`Registry`](crate::registry::Registry).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an identity from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns at most the first `chars` characters of the identity.
    #[must_use]
    pub fn short(&self, chars: usize) -> &str {
        match self.0.char_indices().nth(chars) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({:?})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// Control Mode and Life State
// =============================================================================

/// Who drives an entity's movement.
///
/// Exactly one entity per session is `Local`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMode {
    /// The user of this client; driven by pointer input.
    Local,
    /// Another player; driven by inbound network events.
    Remote,
    /// A non-networked filler fly; driven by a movement policy.
    Autonomous,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// Whether an entity is alive, showing its corpse, or gone from view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifeState {
    /// Drawn and clickable.
    Alive,
    /// Corpse window: drawn as a corpse, not clickable.
    Dying,
    /// Neither drawn nor clickable; waiting for a respawn.
    Hidden,
}

impl fmt::Display for LifeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "alive"),
            Self::Dying => write!(f, "dying"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

/// A hide transition scheduled by `kill`, valid only for one life generation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
struct PendingHide {
    due_ms: f64,
    generation: u32,
}

// =============================================================================
// Entity
// =============================================================================

/// A game avatar with position, life state, score and appearance.
///
/// All operations are total: none of them can fail, and out-of-range
/// inputs (such as a negative `dt`) are clamped.
///
/// Time is measured on the entity's own clock, which only advances through
/// [`Entity::tick`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    mode: ControlMode,
    life: LifeState,
    position: Vec2,
    target: Vec2,
    smoothing: f32,
    score: u32,
    appearance: Appearance,
    tuning: EntityTuning,
    clock_ms: f64,
    generation: u32,
    died_at_ms: Option<f64>,
    pending_hide: Option<PendingHide>,
    catch_up_until_ms: Option<f64>,
    pulse_phase: f32,
    rotation: f32,
    wander: Option<WanderState>,
}

impl Entity {
    /// Creates a live entity at `position` with default appearance.
    #[must_use]
    pub fn new(id: EntityId, mode: ControlMode, position: Vec2, tuning: EntityTuning) -> Self {
        Self {
            id,
            mode,
            life: LifeState::Alive,
            position,
            target: position,
            smoothing: Self::base_smoothing(mode, &tuning),
            score: 0,
            appearance: Appearance::default(),
            tuning,
            clock_ms: 0.0,
            generation: 0,
            died_at_ms: None,
            pending_hide: None,
            catch_up_until_ms: None,
            pulse_phase: 0.0,
            rotation: 0.0,
            wander: None,
        }
    }

    /// Sets the initial appearance.
    #[must_use]
    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    /// Sets the initial pulse phase, so avatars do not breathe in lockstep.
    #[must_use]
    pub fn with_pulse_phase(mut self, phase: f32) -> Self {
        self.pulse_phase = phase.rem_euclid(TAU);
        self
    }

    /// Sets the initial score.
    #[must_use]
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    /// Attaches autonomous movement state.
    #[must_use]
    pub fn with_wander(mut self, wander: WanderState) -> Self {
        self.wander = Some(wander);
        self
    }

    fn base_smoothing(mode: ControlMode, tuning: &EntityTuning) -> f32 {
        match mode {
            ControlMode::Local => tuning.local_smoothing,
            ControlMode::Remote => tuning.remote_smoothing,
            ControlMode::Autonomous => 1.0,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the entity's identity.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the entity's control mode.
    #[must_use]
    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Returns the entity's life state.
    #[must_use]
    pub const fn life(&self) -> LifeState {
        self.life
    }

    /// Returns `true` while the entity is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.life, LifeState::Alive)
    }

    /// Returns `true` unless the entity is hidden.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self.life, LifeState::Hidden)
    }

    /// Returns `true` for the local entity.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.mode, ControlMode::Local)
    }

    /// Current rendered position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Most recent authoritative or input-driven position.
    #[must_use]
    pub const fn target(&self) -> Vec2 {
        self.target
    }

    /// Current interpolation rate per nominal frame.
    #[must_use]
    pub const fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Current appearance (fields may be missing; see [`Appearance`]).
    #[must_use]
    pub const fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Policy values this entity was created with.
    #[must_use]
    pub const fn tuning(&self) -> &EntityTuning {
        &self.tuning
    }

    /// Milliseconds this entity has been ticked for.
    #[must_use]
    pub const fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Life generation; bumped by every kill and respawn.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Entity clock reading at the most recent death, if dead.
    #[must_use]
    pub const fn died_at_ms(&self) -> Option<f64> {
        self.died_at_ms
    }

    /// Pulse animation phase in radians.
    #[must_use]
    pub const fn pulse_phase(&self) -> f32 {
        self.pulse_phase
    }

    /// Rotation animation angle in radians.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Autonomous movement state, if any.
    #[must_use]
    pub const fn wander(&self) -> Option<&WanderState> {
        self.wander.as_ref()
    }

    /// Mutable autonomous movement state, if any.
    #[must_use]
    pub fn wander_mut(&mut self) -> Option<&mut WanderState> {
        self.wander.as_mut()
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    /// Records a new target position.
    ///
    /// Remote entities snap straight to a target farther than the teleport
    /// threshold, and get a temporary smoothing boost so small residual gaps
    /// close faster.
    pub fn set_target(&mut self, target: Vec2) {
        if !target.is_finite() {
            return;
        }
        self.target = target;

        if self.mode == ControlMode::Remote {
            if self.position.distance(target) > self.tuning.teleport_threshold {
                trace!(id = %self.id, "teleport to {target}");
                self.position = target;
            }
            self.smoothing = self.tuning.catch_up_smoothing;
            self.catch_up_until_ms =
                Some(self.clock_ms + f64::from(self.tuning.catch_up_window_ms));
        }
    }

    /// Advances the entity by `dt_ms` milliseconds.
    ///
    /// Live entities move toward their target at a frame-rate independent
    /// rate; cosmetic animation advances regardless of life state. Negative
    /// or non-finite deltas count as zero, so `tick(0.0)` changes nothing.
    /// Deltas longer than [`EntityTuning::max_step_ms`] (250 ms by default)
    /// advance by exactly that much: a long stall is one capped step, not a
    /// skipped one.
    pub fn tick(&mut self, dt_ms: f32) {
        let dt = if dt_ms.is_finite() {
            dt_ms.clamp(0.0, self.tuning.max_step_ms)
        } else {
            0.0
        };
        if dt <= 0.0 {
            return;
        }

        self.clock_ms += f64::from(dt);
        let frames = dt / self.tuning.nominal_frame_ms;

        if self.is_alive() {
            let rate = self.smoothing.clamp(0.0, 1.0);
            let alpha = 1.0 - (1.0 - rate).powf(frames);
            self.position += (self.target - self.position) * alpha;
        }

        let rotation_speed = if self.is_local() {
            self.tuning.local_rotation_speed
        } else {
            self.tuning.remote_rotation_speed
        };
        self.pulse_phase = (self.pulse_phase + self.tuning.pulse_speed * frames).rem_euclid(TAU);
        self.rotation = (self.rotation + rotation_speed * frames).rem_euclid(TAU);

        if let Some(until) = self.catch_up_until_ms {
            if self.clock_ms >= until {
                self.smoothing = Self::base_smoothing(self.mode, &self.tuning);
                self.catch_up_until_ms = None;
            }
        }

        if let Some(pending) = self.pending_hide {
            if pending.generation != self.generation {
                self.pending_hide = None;
            } else if self.clock_ms >= pending.due_ms {
                trace!(id = %self.id, "corpse hidden");
                self.life = LifeState::Hidden;
                self.pending_hide = None;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Life cycle
    // -------------------------------------------------------------------------

    /// Kills a live entity.
    ///
    /// The entity enters [`LifeState::Dying`] and is scheduled to hide once
    /// the corpse window elapses. Returns the notice a presentation layer
    /// needs to play the death effect, using `phrase` if given and the
    /// entity's own death phrase otherwise. Killing an entity that is not
    /// alive does nothing and returns `None`.
    pub fn kill(&mut self, phrase: Option<&str>) -> Option<DeathNotice> {
        if !self.is_alive() {
            return None;
        }

        self.life = LifeState::Dying;
        self.generation = self.generation.wrapping_add(1);
        self.died_at_ms = Some(self.clock_ms);
        self.pending_hide = Some(PendingHide {
            due_ms: self.clock_ms + f64::from(self.tuning.corpse_window_ms),
            generation: self.generation,
        });
        self.catch_up_until_ms = None;
        self.smoothing = Self::base_smoothing(self.mode, &self.tuning);

        let phrase = phrase
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.appearance.death_phrase_or_default());

        Some(DeathNotice {
            id: self.id.clone(),
            position: self.position,
            color: self.appearance.colors_or_default(self.mode).primary,
            glyph: self.appearance.glyph_or_default().to_owned(),
            phrase: phrase.to_owned(),
            local: self.is_local(),
        })
    }

    /// Brings the entity back to life at `position`.
    ///
    /// Cancels any pending hide. The score is kept.
    pub fn respawn(&mut self, position: Vec2) {
        let position = if position.is_finite() {
            position
        } else {
            self.position
        };
        self.generation = self.generation.wrapping_add(1);
        self.pending_hide = None;
        self.died_at_ms = None;
        self.catch_up_until_ms = None;
        self.smoothing = Self::base_smoothing(self.mode, &self.tuning);
        self.position = position;
        self.target = position;
        self.life = LifeState::Alive;
    }

    /// Returns `true` if `point` lies inside the enlarged click radius of a
    /// live entity.
    #[must_use]
    pub fn hit_test(&self, point: Vec2) -> bool {
        if !self.is_alive() {
            return false;
        }
        let hit_radius = self.tuning.radius * self.tuning.hit_radius_scale;
        self.position.distance_squared(point) <= hit_radius * hit_radius
    }

    // -------------------------------------------------------------------------
    // Appearance and score
    // -------------------------------------------------------------------------

    /// Merges the provided fields of `patch` into the appearance. Returns
    /// `true` if anything changed.
    pub fn apply_appearance(&mut self, patch: &AppearancePatch) -> bool {
        self.appearance.merge(patch)
    }

    /// Overwrites the score.
    pub fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    /// Adds one to the score and returns the new value.
    pub fn increment_score(&mut self) -> u32 {
        self.score = self.score.saturating_add(1);
        self.score
    }

    /// Resets the score to zero.
    pub fn reset_score(&mut self) {
        self.score = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
