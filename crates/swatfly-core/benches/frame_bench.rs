use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use swatfly_core::config::GameConfig;
use swatfly_core::effects::DeathEffects;
use swatfly_core::entity::{Appearance, EntityId};
use swatfly_core::link::Disconnected;
use swatfly_core::reconcile::{InboundEvent, Reconciler};
use swatfly_core::render::{Canvas, NullPresenter, Sprite};
use swatfly_core::session::Session;
use swatfly_core::simulation::Simulation;
use swatfly_core::world::World;

/// Touches every sprite so the render pass is not optimised away.
#[derive(Default)]
struct SinkCanvas {
    radius_sum: f32,
}

impl Canvas for SinkCanvas {
    fn clear(&mut self, _size: Vec2) {
        self.radius_sum = 0.0;
    }

    fn draw_background(&mut self, _size: Vec2, _time_ms: f64) {}

    fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
        self.radius_sum += sprite.radius;
    }

    fn draw_effects(&mut self, effects: &DeathEffects) {
        black_box(effects.bursts().len());
    }
}

fn offline_simulation(bots: usize) -> Simulation<Disconnected, NullPresenter> {
    let mut config = GameConfig::default().with_seed(1);
    config.autonomous.count = bots;
    let mut session = Session::new(config, Appearance::default(), Disconnected).unwrap();
    session.start_offline();
    Simulation::new(session, NullPresenter)
}

fn bench_offline_frame(c: &mut Criterion) {
    // 50 autonomous entities is well above a real offline game
    let mut sim = offline_simulation(50);
    let mut canvas = SinkCanvas::default();
    let mut t = 0.0;

    c.bench_function("offline_frame_50", |b| {
        b.iter(|| {
            t += 16.0;
            black_box(sim.frame(t, &mut canvas));
        })
    });
}

fn bench_position_updates(c: &mut Criterion) {
    let mut world = World::new(GameConfig::default());
    let mut reconciler = Reconciler::default();
    reconciler.apply(
        &mut world,
        InboundEvent::Init {
            local_id: EntityId::new("p0"),
            position: Vec2::ZERO,
            roster: Vec::new(),
            leaderboard: Vec::new(),
        },
    );
    let ids: Vec<EntityId> = (1..=100).map(|i| EntityId::new(format!("p{i}"))).collect();

    c.bench_function("position_updates_100", |b| {
        let mut step = 0.0f32;
        b.iter(|| {
            step += 1.0;
            for (i, id) in ids.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let x = (i as f32 * 7.0 + step) % 1280.0;
                reconciler.apply(
                    &mut world,
                    InboundEvent::Position {
                        id: id.clone(),
                        position: Vec2::new(x, 360.0),
                    },
                );
            }
            world.step_entities(black_box(16.0));
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let text = r#"{"type":"position_update","playerId":"p42","x":512.5,"y":300.25}"#;
    c.bench_function("decode_position_update", |b| {
        b.iter(|| black_box(swatfly_core::protocol::decode(black_box(text))))
    });
}

criterion_group!(benches, bench_offline_frame, bench_position_updates, bench_decode);
criterion_main!(benches);
