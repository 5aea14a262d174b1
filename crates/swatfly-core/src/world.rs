//! World module: the mutable state of one client session.
//!
//! The [`World`] bundles the [`Registry`] with everything the operations on
//! it draw from or feed into:
//! - the session [`GameConfig`]
//! - a seeded random source (`ChaCha8Rng`), so a run is reproducible from
//!   its seed
//! - the session clock, advanced once per frame
//! - the presentation [`Notices`] queue
//! - offline respawn deadlines
//!
//! Helpers that both mutate the registry and consume randomness live here,
//! so callers never need to split borrows themselves.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config::GameConfig;
use crate::entity::{Appearance, ControlMode, Entity, EntityId};
use crate::movement::{policy_for, SteerContext, WanderState, AUTONOMOUS_GLYPHS};
use crate::notice::{Dirty, Notices, OverlayChange};
use crate::registry::Registry;

/// Identity of the local entity in offline mode.
pub const OFFLINE_LOCAL_ID: &str = "local";

/// Attempts made to find a spawn point clear of the central button.
const SPAWN_ATTEMPTS: usize = 64;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A respawn waiting for the session clock to reach `due_ms`.
#[derive(Debug, Clone, PartialEq)]
struct ScheduledRespawn {
    id: EntityId,
    due_ms: f64,
}

/// The state every session operation works on.
#[derive(Debug, Clone)]
pub struct World {
    /// All entities.
    pub registry: Registry,
    /// Pending presentation notices.
    pub notices: Notices,
    config: GameConfig,
    rng: ChaCha8Rng,
    clock_ms: f64,
    respawns: Vec<ScheduledRespawn>,
}

impl World {
    /// Creates an empty world seeded from `config.seed`.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            registry: Registry::new(),
            notices: Notices::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            clock_ms: 0.0,
            respawns: Vec::new(),
        }
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The session random source.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Milliseconds of simulated time so far.
    #[must_use]
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Advances the session clock.
    pub fn advance_clock(&mut self, dt_ms: f32) {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.clock_ms += f64::from(dt_ms);
        }
    }

    /// Removes every entity, pending respawn and undelivered notice. The
    /// clock keeps running.
    ///
    /// If the local entity was dead, its death overlay is hidden: nothing
    /// will respawn it any more.
    pub fn reset(&mut self) {
        let local_dead = self.registry.local_entity().is_some_and(|e| !e.is_alive());
        self.registry.clear();
        self.respawns.clear();
        self.notices.clear();
        if local_dead {
            self.notices.overlay(OverlayChange::Hide);
        }
        self.notices.mark(Dirty::SCOREBOARD);
    }

    // =========================================================================
    // Random placement
    // =========================================================================

    /// A uniformly random point on the canvas.
    pub fn random_point(&mut self) -> Vec2 {
        let canvas = self.config.canvas;
        Vec2::new(
            self.rng.gen::<f32>() * canvas.x,
            self.rng.gen::<f32>() * canvas.y,
        )
    }

    /// A random point at least the spawn margin away from the canvas edges
    /// and from the central button's rim.
    ///
    /// Gives up after a bounded number of attempts on canvases too small to
    /// have such a point, returning the last candidate.
    pub fn random_point_clear_of_button(&mut self) -> Vec2 {
        let canvas = self.config.canvas;
        let button = self.config.central_button;
        let margin = self.config.autonomous.spawn_margin;
        let keep_out = button.radius + margin;
        let span = (canvas - Vec2::splat(margin * 2.0)).max(Vec2::ZERO);

        let mut candidate = canvas * 0.5;
        for _ in 0..SPAWN_ATTEMPTS {
            candidate = Vec2::splat(margin)
                + Vec2::new(self.rng.gen::<f32>() * span.x, self.rng.gen::<f32>() * span.y);
            if candidate.distance(button.center) >= keep_out {
                return candidate;
            }
        }
        debug!("no spawn point clear of the button, using {candidate}");
        candidate
    }

    fn random_phase(rng: &mut ChaCha8Rng) -> f32 {
        rng.gen::<f32>() * TAU
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Creates the local entity at `position`, replacing any previous one.
    pub fn spawn_local(&mut self, id: EntityId, position: Vec2, appearance: Appearance) -> &mut Entity {
        let phase = Self::random_phase(&mut self.rng);
        let entity = Entity::new(id.clone(), ControlMode::Local, position, self.config.entity)
            .with_appearance(appearance)
            .with_pulse_phase(phase);
        self.registry.remove(&id);
        self.notices.mark(Dirty::SCOREBOARD | Dirty::CURSOR);
        self.registry.upsert(&id, move || entity)
    }

    /// Returns the remote entity `id`, materializing a placeholder if absent.
    ///
    /// The placeholder has default appearance and sits at `position`, or at
    /// a random canvas point when no position is known. Callers filter the
    /// local identity before calling.
    pub fn upsert_remote(&mut self, id: &EntityId, position: Option<Vec2>) -> &mut Entity {
        let Self {
            registry,
            notices,
            config,
            rng,
            ..
        } = self;

        registry.upsert(id, || {
            let position = position.unwrap_or_else(|| {
                Vec2::new(rng.gen::<f32>() * config.canvas.x, rng.gen::<f32>() * config.canvas.y)
            });
            debug!(%id, "materializing remote entity at {position}");
            notices.mark(Dirty::SCOREBOARD);
            Entity::new(id.clone(), ControlMode::Remote, position, config.entity)
                .with_pulse_phase(Self::random_phase(rng))
        })
    }

    /// Spawns one autonomous entity clear of the central button.
    pub fn spawn_autonomous(&mut self) -> EntityId {
        let suffix: String = (0..8)
            .map(|_| char::from(ID_ALPHABET[self.rng.gen_range(0..ID_ALPHABET.len())]))
            .collect();
        let id = EntityId::new(format!("ai-{suffix}"));
        let position = self.random_point_clear_of_button();
        let glyph = AUTONOMOUS_GLYPHS[self.rng.gen_range(0..AUTONOMOUS_GLYPHS.len())];
        let wander = WanderState::new(&self.config.autonomous.wander, &mut self.rng);
        let phase = Self::random_phase(&mut self.rng);

        let entity = Entity::new(id.clone(), ControlMode::Autonomous, position, self.config.entity)
            .with_appearance(Appearance {
                glyph: Some(glyph.to_owned()),
                ..Appearance::default()
            })
            .with_pulse_phase(phase)
            .with_wander(wander);

        if self.registry.insert(entity) {
            debug!(%id, "spawned autonomous entity");
            self.notices.mark(Dirty::SCOREBOARD);
        }
        id
    }

    // =========================================================================
    // Life cycle
    // =========================================================================

    /// Kills entity `id`, queueing its death notice.
    ///
    /// A local death also queues the death overlay. Returns `false` if the
    /// entity is absent or not alive.
    pub fn kill(&mut self, id: &EntityId, phrase: Option<&str>) -> bool {
        let respawn_in_ms = self.config.timing.respawn_delay_ms;
        let Some(notice) = self.registry.find_mut(id).and_then(|e| e.kill(phrase)) else {
            trace!(%id, "kill ignored");
            return false;
        };

        debug!(%id, phrase = %notice.phrase, "entity died");
        if notice.local {
            self.notices.overlay(OverlayChange::Show {
                phrase: notice.phrase.clone(),
                respawn_in_ms: Some(respawn_in_ms),
            });
        }
        self.notices.death(notice);
        true
    }

    /// Respawns entity `id` at `position`, cancelling any scheduled respawn.
    ///
    /// A local respawn hides the death overlay. Returns `false` if the
    /// entity is absent.
    pub fn respawn(&mut self, id: &EntityId, position: Vec2) -> bool {
        self.cancel_respawn(id);
        let Some(entity) = self.registry.find_mut(id) else {
            return false;
        };
        entity.respawn(position);
        debug!(%id, "entity respawned at {position}");
        if entity.is_local() {
            self.notices.overlay(OverlayChange::Hide);
        }
        true
    }

    /// Schedules a respawn of `id` after `delay_ms`, replacing any earlier one.
    pub fn schedule_respawn(&mut self, id: &EntityId, delay_ms: f32) {
        self.cancel_respawn(id);
        self.respawns.push(ScheduledRespawn {
            id: id.clone(),
            due_ms: self.clock_ms + f64::from(delay_ms),
        });
    }

    /// Drops a scheduled respawn of `id`, if any.
    pub fn cancel_respawn(&mut self, id: &EntityId) {
        self.respawns.retain(|r| &r.id != id);
    }

    /// Number of respawns waiting for their deadline.
    #[must_use]
    pub fn pending_respawns(&self) -> usize {
        self.respawns.len()
    }

    /// Removes and returns every respawn whose deadline has passed, in
    /// scheduling order.
    pub fn take_due_respawns(&mut self) -> Vec<EntityId> {
        let now = self.clock_ms;
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.respawns.drain(..).partition(|r| now >= r.due_ms);
        self.respawns = waiting;
        due.into_iter().map(|r| r.id).collect()
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advances every entity by `dt_ms`, steering autonomous ones first.
    pub fn step_entities(&mut self, dt_ms: f32) {
        let Self {
            registry,
            config,
            rng,
            ..
        } = self;

        for entity in registry.iter_mut() {
            if let Some(policy) = policy_for(entity.mode()) {
                let mut ctx = SteerContext {
                    canvas: config.canvas,
                    button: config.central_button,
                    tuning: &config.autonomous.wander,
                    rng: &mut *rng,
                };
                policy.steer(entity, dt_ms, &mut ctx);
            }
            entity.tick(dt_ms);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::LifeState;

    fn world() -> World {
        World::new(GameConfig::with_canvas(800.0, 600.0).with_seed(11))
    }

    mod placement_tests {
        use super::*;

        #[test]
        fn random_points_stay_on_canvas() {
            let mut world = world();
            for _ in 0..500 {
                let p = world.random_point();
                assert!((0.0..=800.0).contains(&p.x));
                assert!((0.0..=600.0).contains(&p.y));
            }
        }

        #[test]
        fn spawn_points_avoid_button() {
            let mut world = world();
            let button = world.config().central_button;
            for _ in 0..500 {
                let p = world.random_point_clear_of_button();
                assert!(p.distance(button.center) >= button.radius + 50.0);
                assert!((50.0..=750.0).contains(&p.x));
            }
        }

        #[test]
        fn tiny_canvas_still_returns() {
            let mut world = World::new(GameConfig::with_canvas(60.0, 60.0));
            let p = world.random_point_clear_of_button();
            assert!(p.is_finite());
        }

        #[test]
        fn same_seed_same_points() {
            let mut a = world();
            let mut b = world();
            for _ in 0..10 {
                assert_eq!(a.random_point(), b.random_point());
            }
        }
    }

    mod spawn_tests {
        use super::*;

        #[test]
        fn spawn_local_replaces_previous() {
            let mut world = world();
            world.spawn_local(EntityId::new("a"), Vec2::ZERO, Appearance::default());
            world.spawn_local(EntityId::new("b"), Vec2::ONE, Appearance::default());

            assert_eq!(world.registry.len(), 1);
            assert_eq!(world.registry.local_id().unwrap().as_str(), "b");
            assert!(world.notices.dirty().contains(Dirty::CURSOR));
        }

        #[test]
        fn upsert_remote_uses_known_position() {
            let mut world = world();
            let id = EntityId::new("p2");
            let entity = world.upsert_remote(&id, Some(Vec2::new(5.0, 6.0)));
            assert_eq!(entity.position(), Vec2::new(5.0, 6.0));
            assert_eq!(entity.mode(), ControlMode::Remote);

            // Existing entity keeps its position.
            let entity = world.upsert_remote(&id, Some(Vec2::new(99.0, 99.0)));
            assert_eq!(entity.position(), Vec2::new(5.0, 6.0));
        }

        #[test]
        fn autonomous_ids_are_prefixed_and_unique() {
            let mut world = world();
            let a = world.spawn_autonomous();
            let b = world.spawn_autonomous();
            assert!(a.as_str().starts_with("ai-"));
            assert_eq!(a.as_str().len(), 11);
            assert_ne!(a, b);
            assert!(world.registry.find(&a).unwrap().wander().is_some());
        }
    }

    mod life_cycle_tests {
        use super::*;

        #[test]
        fn local_kill_and_respawn_toggle_overlay() {
            let mut world = world();
            let id = EntityId::new("me");
            world.spawn_local(id.clone(), Vec2::ZERO, Appearance::default());
            world.notices.take();

            assert!(world.kill(&id, None));
            let batch = world.notices.take();
            assert_eq!(batch.deaths.len(), 1);
            assert!(matches!(batch.overlay[0], OverlayChange::Show { .. }));

            assert!(world.respawn(&id, Vec2::ONE));
            assert_eq!(world.notices.take().overlay, vec![OverlayChange::Hide]);
        }

        #[test]
        fn reset_drops_notices_and_hides_overlay() {
            let mut world = world();
            let me = EntityId::new("me");
            let other = EntityId::new("p2");
            world.spawn_local(me.clone(), Vec2::ZERO, Appearance::default());
            world.upsert_remote(&other, None);
            world.kill(&me, None);
            world.kill(&other, None);
            world.schedule_respawn(&me, 100.0);

            world.reset();
            assert!(world.registry.is_empty());
            let batch = world.notices.take();
            assert!(batch.deaths.is_empty());
            assert_eq!(batch.overlay, vec![OverlayChange::Hide]);
            assert!(batch.dirty.contains(Dirty::SCOREBOARD));

            world.advance_clock(500.0);
            assert!(world.take_due_respawns().is_empty());
        }

        #[test]
        fn reset_with_live_local_leaves_overlay_alone() {
            let mut world = world();
            world.spawn_local(EntityId::new("me"), Vec2::ZERO, Appearance::default());
            world.reset();
            assert!(world.notices.take().overlay.is_empty());
        }

        #[test]
        fn kill_absent_or_dead_is_ignored() {
            let mut world = world();
            assert!(!world.kill(&EntityId::new("ghost"), None));

            let id = EntityId::new("p2");
            world.upsert_remote(&id, None);
            assert!(world.kill(&id, None));
            assert!(!world.kill(&id, None));
            assert_eq!(world.notices.pending_deaths(), 1);
        }

        #[test]
        fn scheduled_respawns_fire_on_deadline() {
            let mut world = world();
            let id = EntityId::new("p2");
            world.upsert_remote(&id, None);
            world.kill(&id, None);
            world.schedule_respawn(&id, 5000.0);

            world.advance_clock(4999.0);
            assert!(world.take_due_respawns().is_empty());
            world.advance_clock(1.0);
            assert_eq!(world.take_due_respawns(), vec![id]);
            assert_eq!(world.pending_respawns(), 0);
        }

        #[test]
        fn respawn_cancels_schedule() {
            let mut world = world();
            let id = EntityId::new("p2");
            world.upsert_remote(&id, None);
            world.kill(&id, None);
            world.schedule_respawn(&id, 100.0);
            world.respawn(&id, Vec2::ZERO);

            world.advance_clock(200.0);
            assert!(world.take_due_respawns().is_empty());
            assert_eq!(world.registry.find(&id).unwrap().life(), LifeState::Alive);
        }
    }

    mod step_tests {
        use super::*;

        #[test]
        fn step_moves_autonomous_entities() {
            let mut world = world();
            let id = world.spawn_autonomous();
            let before = world.registry.find(&id).unwrap().position();
            for _ in 0..120 {
                world.step_entities(16.0);
            }
            let after = world.registry.find(&id).unwrap().position();
            assert_ne!(before, after);
        }

        #[test]
        fn step_hides_corpses() {
            let mut world = world();
            let id = EntityId::new("p2");
            world.upsert_remote(&id, None);
            world.kill(&id, None);
            for _ in 0..10 {
                world.step_entities(250.0);
            }
            assert_eq!(world.registry.find(&id).unwrap().life(), LifeState::Hidden);
        }
    }
}
