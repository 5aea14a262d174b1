//! Simulation module with the per-frame update/render loop.
//!
//! The host calls [`Simulation::frame`] once per animation frame with its
//! timestamp. Each frame runs in a fixed order:
//!
//! 1. **DELTA**: Elapsed time since the previous frame. The first frame
//!    substitutes a nominal delta; later deltas are clamped so a stalled tab
//!    cannot produce a huge step.
//! 2. **ENTITIES**: Autonomous entities are steered by their movement
//!    policy, then every entity ticks.
//! 3. **SESSION**: Clock, offline respawns and keep-alives.
//! 4. **EFFECTS**: Particle bursts and corpses advance.
//! 5. **RENDER**: Pending notices go to the presenter, then the canvas is
//!    cleared and redrawn: background, visible entities in insertion order,
//!    effects on top.
//!
//! The frame reports [`FrameStatus::Stopped`] once the session has been
//! torn down, and the host should stop scheduling frames.
//!
//! # Example
//!
//! ```
//! use swatfly_core::config::GameConfig;
//! use swatfly_core::effects::DeathEffects;
//! use swatfly_core::entity::Appearance;
//! use swatfly_core::link::Disconnected;
//! use swatfly_core::render::{Canvas, NullPresenter, Sprite};
//! use swatfly_core::session::Session;
//! use swatfly_core::simulation::{FrameStatus, Simulation};
//! use glam::Vec2;
//!
//! struct Blank;
//! impl Canvas for Blank {
//!     fn clear(&mut self, _size: Vec2) {}
//!     fn draw_background(&mut self, _size: Vec2, _time_ms: f64) {}
//!     fn draw_sprite(&mut self, _sprite: &Sprite<'_>) {}
//!     fn draw_effects(&mut self, _effects: &DeathEffects) {}
//! }
//!
//! let mut session =
//!     Session::new(GameConfig::default(), Appearance::default(), Disconnected).unwrap();
//! session.start_offline();
//! let mut sim = Simulation::new(session, NullPresenter);
//!
//! for frame in 0..10 {
//!     assert_eq!(sim.frame(f64::from(frame) * 16.0, &mut Blank), FrameStatus::Continue);
//! }
//! sim.stop();
//! assert_eq!(sim.frame(160.0, &mut Blank), FrameStatus::Stopped);
//! ```

use tracing::{debug, trace};

use crate::effects::DeathEffects;
use crate::link::Transport;
use crate::notice::{Dirty, NoticeBatch, OverlayChange};
use crate::render::{Canvas, Presenter, Sprite};
use crate::session::Session;

/// Mixed into the session seed so effects draw from their own stream.
const EFFECTS_SEED_SALT: u64 = 0x5EED_EFFE_C75;

/// Whether the host should schedule another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Keep going.
    Continue,
    /// The session was torn down.
    Stopped,
}

// =============================================================================
// Simulation
// =============================================================================

/// Drives one session frame by frame.
///
/// Owns the session, the death effects and the presenter. The canvas is
/// borrowed per frame so the host keeps control of its drawing surface.
#[derive(Debug)]
pub struct Simulation<T, P> {
    session: Session<T>,
    effects: DeathEffects,
    presenter: P,
    last_timestamp_ms: Option<f64>,
    frames: u64,
    running: bool,
}

impl<T: Transport, P: Presenter> Simulation<T, P> {
    /// Creates a running simulation over `session`.
    #[must_use]
    pub fn new(session: Session<T>, presenter: P) -> Self {
        let config = session.world().config();
        let effects = DeathEffects::new(
            config.seed ^ EFFECTS_SEED_SALT,
            config.entity.nominal_frame_ms,
        );
        Self {
            session,
            effects,
            presenter,
            last_timestamp_ms: None,
            frames: 0,
            running: true,
        }
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// The session, mutably. Input and inbound messages go through here.
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// Live death effects.
    #[must_use]
    pub fn effects(&self) -> &DeathEffects {
        &self.effects
    }

    /// The presenter.
    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// The presenter, mutably.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Frames run so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns `false` once [`Simulation::stop`] has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Runs one frame at host time `timestamp_ms`.
    pub fn frame(&mut self, timestamp_ms: f64, canvas: &mut impl Canvas) -> FrameStatus {
        if !self.running {
            return FrameStatus::Stopped;
        }

        let dt_ms = self.frame_delta(timestamp_ms);
        self.update(dt_ms);
        self.render(canvas);
        self.frames += 1;
        FrameStatus::Continue
    }

    /// Elapsed time for a frame at `timestamp_ms`, clamped to the configured
    /// maximum. The first call returns the nominal first-frame delta.
    fn frame_delta(&mut self, timestamp_ms: f64) -> f32 {
        let timing = self.session.world().config().timing;
        let previous = self.last_timestamp_ms.replace(timestamp_ms);

        let Some(previous) = previous else {
            return timing.first_frame_ms;
        };

        let elapsed = timestamp_ms - previous;
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation)]
        let elapsed = elapsed.min(f64::from(timing.max_frame_ms)) as f32;
        elapsed
    }

    /// Advances entities, the session and effects by `dt_ms`.
    pub fn update(&mut self, dt_ms: f32) {
        trace!(dt_ms, "update");
        self.session.world_mut().step_entities(dt_ms);
        self.session.advance(dt_ms);
        self.effects.update(dt_ms);
    }

    /// Delivers pending notices to the presenter and redraws `canvas`.
    pub fn render(&mut self, canvas: &mut impl Canvas) {
        let batch = self.session.world_mut().notices.take();
        if !batch.is_empty() {
            self.present(batch);
        }

        let world = self.session.world();
        let size = world.config().canvas;
        canvas.clear(size);
        canvas.draw_background(size, world.clock_ms());
        for entity in world.registry.iter().filter(|e| e.is_visible()) {
            canvas.draw_sprite(&Sprite::from_entity(entity));
        }
        canvas.draw_effects(&self.effects);
    }

    fn present(&mut self, batch: NoticeBatch) {
        for notice in &batch.deaths {
            self.effects.spawn(notice);
            self.presenter.death_effect(notice);
        }

        for change in batch.overlay {
            match change {
                OverlayChange::Show {
                    phrase,
                    respawn_in_ms,
                } => self.presenter.show_death_overlay(&phrase, respawn_in_ms),
                OverlayChange::Hide => self.presenter.hide_death_overlay(),
            }
        }

        let registry = &self.session.world().registry;
        if batch.dirty.contains(Dirty::SCOREBOARD) {
            let ranked: Vec<_> = registry.ranked().collect();
            self.presenter.scoreboard(&ranked);
        }
        if batch.dirty.contains(Dirty::CURSOR) {
            if let Some(local) = registry.local_entity() {
                self.presenter.cursor_glyph(local.appearance().glyph_or_default());
            }
        }
    }

    /// Stops the loop and tears the session down.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        debug!(frames = self.frames, "simulation stopped");
        self.running = false;
        self.session.teardown();
        self.effects.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::entity::{Appearance, Entity, EntityId, LifeState};
    use crate::link::Disconnected;
    use crate::notice::DeathNotice;
    use glam::Vec2;

    #[derive(Default)]
    struct Calls(Vec<String>);

    impl Canvas for Calls {
        fn clear(&mut self, _size: Vec2) {
            self.0.push("clear".to_owned());
        }

        fn draw_background(&mut self, _size: Vec2, _time_ms: f64) {
            self.0.push("background".to_owned());
        }

        fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
            self.0.push(format!("sprite:{}", sprite.id));
        }

        fn draw_effects(&mut self, _effects: &DeathEffects) {
            self.0.push("effects".to_owned());
        }
    }

    impl Presenter for Calls {
        fn death_effect(&mut self, notice: &DeathNotice) {
            self.0.push(format!("death:{}", notice.id));
        }

        fn scoreboard(&mut self, ranked: &[&Entity]) {
            self.0.push(format!("scoreboard:{}", ranked.len()));
        }

        fn cursor_glyph(&mut self, glyph: &str) {
            self.0.push(format!("cursor:{glyph}"));
        }
    }

    fn simulation() -> Simulation<Disconnected, Calls> {
        let session = Session::new(
            GameConfig::with_canvas(800.0, 600.0).with_seed(5),
            Appearance::default(),
            Disconnected,
        )
        .unwrap();
        Simulation::new(session, Calls::default())
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn first_frame_uses_nominal_delta() {
            let mut sim = simulation();
            assert_eq!(sim.frame_delta(5000.0), 16.0);
            assert_eq!(sim.frame_delta(5020.0), 20.0);
        }

        #[test]
        fn large_gap_is_clamped() {
            let mut sim = simulation();
            sim.frame_delta(0.0);
            assert_eq!(sim.frame_delta(10_000.0), 250.0);
        }

        #[test]
        fn backwards_time_is_zero() {
            let mut sim = simulation();
            sim.frame_delta(100.0);
            assert_eq!(sim.frame_delta(50.0), 0.0);
            assert_eq!(sim.frame_delta(f64::NAN), 0.0);
        }

        #[test]
        fn clock_follows_frames() {
            let mut sim = simulation();
            let mut canvas = Calls::default();
            sim.frame(1000.0, &mut canvas);
            sim.frame(1033.0, &mut canvas);
            assert!((sim.session().world().clock_ms() - 49.0).abs() < 1e-9);
            assert_eq!(sim.frames(), 2);
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn draw_order_is_fixed() {
            let mut sim = simulation();
            let world = sim.session_mut().world_mut();
            world.spawn_local(EntityId::new("me"), Vec2::ZERO, Appearance::default());
            world.upsert_remote(&EntityId::new("p2"), Some(Vec2::ONE));
            world.notices.take();

            let mut canvas = Calls::default();
            sim.frame(0.0, &mut canvas);
            assert_eq!(
                canvas.0,
                ["clear", "background", "sprite:me", "sprite:p2", "effects"]
            );
        }

        #[test]
        fn hidden_entities_are_not_drawn() {
            let mut sim = simulation();
            let world = sim.session_mut().world_mut();
            let id = EntityId::new("p2");
            world.upsert_remote(&id, Some(Vec2::ONE));
            world.kill(&id, None);

            let mut canvas = Calls::default();
            let mut t = 0.0;
            while sim.session().world().registry.find(&id).unwrap().life() != LifeState::Hidden {
                sim.frame(t, &mut canvas);
                t += 250.0;
            }
            canvas.0.clear();
            sim.frame(t, &mut canvas);
            assert!(!canvas.0.iter().any(|c| c.starts_with("sprite")));
        }

        #[test]
        fn notices_reach_presenter_once() {
            let mut sim = simulation();
            let world = sim.session_mut().world_mut();
            world.spawn_local(EntityId::new("me"), Vec2::ZERO, Appearance::named("Me", "🐝"));
            let id = EntityId::new("p2");
            world.upsert_remote(&id, Some(Vec2::ONE));
            world.kill(&id, None);

            let mut canvas = Calls::default();
            sim.frame(0.0, &mut canvas);
            sim.frame(16.0, &mut canvas);

            let presented = &sim.presenter().0;
            assert_eq!(presented, &["death:p2", "scoreboard:2", "cursor:🐝"]);
            assert_eq!(sim.effects().bursts().len(), 1);
        }
    }

    #[test]
    fn stop_tears_down() {
        let mut sim = simulation();
        sim.session_mut().start_offline();
        let mut canvas = Calls::default();
        assert_eq!(sim.frame(0.0, &mut canvas), FrameStatus::Continue);

        sim.stop();
        assert!(!sim.is_running());
        assert!(sim.session().world().registry.is_empty());
        assert_eq!(sim.frame(16.0, &mut canvas), FrameStatus::Stopped);
    }
}
