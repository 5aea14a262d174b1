//! Rendering and presentation seams.
//!
//! The core never draws pixels or touches UI. It talks to two collaborators
//! supplied by the host:
//!
//! - a [`Canvas`], redrawn from scratch every frame
//! - a [`Presenter`], told about deaths, score changes, cursor changes and
//!   the local death overlay
//!
//! Both are only ever called from the simulation's render step.
//!
//! [`Sprite::from_entity`] resolves every optional appearance field to its
//! default, so drawing an entity never fails however incomplete it is.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::effects::DeathEffects;
use crate::entity::{ColorPair, ControlMode, Entity, EntityId, LifeState};
use crate::notice::DeathNotice;

/// Wobble period divisor for autonomous entities, in milliseconds.
const WOBBLE_PERIOD_MS: f64 = 200.0;

// =============================================================================
// Sprite
// =============================================================================

/// Everything needed to draw one entity, with defaults resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite<'a> {
    /// Entity identity.
    pub id: &'a EntityId,
    /// Centre in canvas pixels.
    pub position: Vec2,
    /// Radius after the pulse is applied.
    pub radius: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Glyph.
    pub glyph: &'a str,
    /// Display name.
    pub name: String,
    /// Fill colours.
    pub colors: ColorPair,
    /// Alive, or dying (draw as a corpse).
    pub life: LifeState,
    /// Draw the local highlight border.
    pub local: bool,
    /// Autonomous entity in frenzy.
    pub frenzy: bool,
}

impl<'a> Sprite<'a> {
    /// Builds the sprite for `entity`.
    #[must_use]
    pub fn from_entity(entity: &'a Entity) -> Self {
        let tuning = entity.tuning();
        let pulse = 1.0 + entity.pulse_phase().sin() * tuning.pulse_amount;
        let frenzy = entity.wander().is_some_and(|w| w.frenzy);

        let rotation = if entity.mode() == ControlMode::Autonomous {
            let amplitude = if frenzy { 0.4 } else { 0.2 };
            #[allow(clippy::cast_possible_truncation)]
            let wave = (entity.clock_ms() / WOBBLE_PERIOD_MS).sin() as f32;
            wave * amplitude
        } else {
            entity.rotation()
        };

        Self {
            id: entity.id(),
            position: entity.position(),
            radius: tuning.radius * pulse,
            rotation: rotation.rem_euclid(TAU),
            glyph: entity.appearance().glyph_or_default(),
            name: entity.appearance().name_or_default(entity.id()),
            colors: entity.appearance().colors_or_default(entity.mode()),
            life: entity.life(),
            local: entity.is_local(),
            frenzy,
        }
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// A 2D drawing surface.
pub trait Canvas {
    /// Clears the whole surface.
    fn clear(&mut self, size: Vec2);

    /// Draws the decorative background. `time_ms` is the session clock.
    fn draw_background(&mut self, size: Vec2, time_ms: f64);

    /// Draws one visible entity.
    fn draw_sprite(&mut self, sprite: &Sprite<'_>);

    /// Draws the death effects on top of everything else.
    fn draw_effects(&mut self, effects: &DeathEffects);
}

// =============================================================================
// Presenter
// =============================================================================

/// UI collaborators outside the canvas. Every method defaults to doing
/// nothing.
pub trait Presenter {
    /// A death effect should play (sound, flash).
    fn death_effect(&mut self, _notice: &DeathNotice) {}

    /// Scores or the roster changed. `ranked` is ordered by score.
    fn scoreboard(&mut self, _ranked: &[&Entity]) {}

    /// The local entity's glyph changed.
    fn cursor_glyph(&mut self, _glyph: &str) {}

    /// The local entity died.
    fn show_death_overlay(&mut self, _phrase: &str, _respawn_in_ms: Option<f32>) {}

    /// The local entity respawned.
    fn hide_death_overlay(&mut self) {}
}

/// A presenter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn death_effect(&mut self, notice: &DeathNotice) {
        (**self).death_effect(notice);
    }

    fn scoreboard(&mut self, ranked: &[&Entity]) {
        (**self).scoreboard(ranked);
    }

    fn cursor_glyph(&mut self, glyph: &str) {
        (**self).cursor_glyph(glyph);
    }

    fn show_death_overlay(&mut self, phrase: &str, respawn_in_ms: Option<f32>) {
        (**self).show_death_overlay(phrase, respawn_in_ms);
    }

    fn hide_death_overlay(&mut self) {
        (**self).hide_death_overlay();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityTuning;
    use crate::entity::Appearance;

    fn entity(mode: ControlMode) -> Entity {
        Entity::new(EntityId::new("abcdefghij"), mode, Vec2::new(1.0, 2.0), EntityTuning::default())
    }

    #[test]
    fn sprite_resolves_defaults() {
        let e = entity(ControlMode::Remote);
        let sprite = Sprite::from_entity(&e);
        assert_eq!(sprite.glyph, "🪰");
        assert_eq!(sprite.name, "Player_abcdef");
        assert_eq!(sprite.colors, ColorPair::remote());
        assert_eq!(sprite.radius, 20.0);
        assert!(!sprite.local);
    }

    #[test]
    fn sprite_uses_appearance() {
        let e = entity(ControlMode::Local).with_appearance(Appearance::named("Me", "🐝"));
        let sprite = Sprite::from_entity(&e);
        assert_eq!(sprite.glyph, "🐝");
        assert_eq!(sprite.name, "Me");
        assert_eq!(sprite.colors, ColorPair::local());
        assert!(sprite.local);
    }

    #[test]
    fn pulse_scales_radius() {
        let e = entity(ControlMode::Remote).with_pulse_phase(std::f32::consts::FRAC_PI_2);
        let sprite = Sprite::from_entity(&e);
        assert!((sprite.radius - 22.0).abs() < 1e-4);
    }

    #[test]
    fn dying_sprite_reports_life() {
        let mut e = entity(ControlMode::Remote);
        e.kill(None);
        assert_eq!(Sprite::from_entity(&e).life, LifeState::Dying);
    }

    #[test]
    fn null_presenter_accepts_everything() {
        let mut presenter = NullPresenter;
        presenter.cursor_glyph("🪰");
        presenter.hide_death_overlay();
        presenter.scoreboard(&[]);
    }
}
