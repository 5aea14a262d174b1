//! Decorative death effects.
//!
//! Every death spawns two effects:
//! - a [`Burst`]: coloured particles flung outward under gravity, with the
//!   death phrase floating up above them, both fading over 1.5 s
//! - a [`Corpse`]: the entity's glyph tumbling down, shrinking to half size
//!   and fading over 2 s
//!
//! Motion constants are per nominal frame and scaled by the real frame delta.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::notice::DeathNotice;

/// Phrases picked from when a death carries none.
pub const DEATH_PHRASES: [&str; 10] = [
    "SPLAT!",
    "Buzz-ted!",
    "Bug off!",
    "Squished!",
    "Swatted!",
    "Fly no more!",
    "Ouch!",
    "Exterminated!",
    "Game Over!",
    "Smacked!",
];

const BURST_LIFETIME_MS: f32 = 1500.0;
const CORPSE_LIFETIME_MS: f32 = 2000.0;
const MIN_PARTICLES: usize = 20;
const EXTRA_PARTICLES: usize = 10;
const TEXT_OFFSET_Y: f32 = -40.0;
const TEXT_SPEED_Y: f32 = -2.0;
const TEXT_DRAG: f32 = 0.98;
const CORPSE_SPEED_Y: f32 = 0.5;
const CORPSE_GRAVITY: f32 = 0.05;
const CORPSE_SPIN: f32 = 0.1;

/// Colour of the floating phrase.
pub const TEXT_COLOR: &str = "#ff0000";

/// One particle of a burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Current position.
    pub position: Vec2,
    /// Velocity in pixels per nominal frame.
    pub velocity: Vec2,
    /// Radius in pixels.
    pub size: f32,
    /// Downward acceleration per nominal frame.
    pub gravity: f32,
}

/// The phrase floating above a burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingText {
    /// Current position.
    pub position: Vec2,
    /// Vertical speed in pixels per nominal frame.
    pub speed_y: f32,
    /// The phrase.
    pub text: String,
}

/// A particle burst with its floating phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Burst {
    /// Particles.
    pub particles: Vec<Particle>,
    /// Phrase.
    pub text: FloatingText,
    /// Particle colour.
    pub color: String,
    /// Milliseconds since spawn.
    pub age_ms: f32,
}

impl Burst {
    /// Opacity of particles and text, from 1 down to 0.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        (1.0 - self.age_ms / BURST_LIFETIME_MS).clamp(0.0, 1.0)
    }
}

/// A falling, tumbling corpse glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpse {
    /// Current position.
    pub position: Vec2,
    /// Falling speed in pixels per nominal frame.
    pub speed_y: f32,
    /// Glyph.
    pub glyph: String,
    /// Rotation in radians.
    pub rotation: f32,
    /// Milliseconds since spawn.
    pub age_ms: f32,
}

impl Corpse {
    fn progress(&self) -> f32 {
        (self.age_ms / CORPSE_LIFETIME_MS).clamp(0.0, 1.0)
    }

    /// Opacity, from 1 down to 0.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        1.0 - self.progress()
    }

    /// Draw scale, from 1 down to 0.5.
    #[must_use]
    pub fn scale(&self) -> f32 {
        1.0 - 0.5 * self.progress()
    }
}

/// All live death effects.
#[derive(Debug, Clone)]
pub struct DeathEffects {
    bursts: Vec<Burst>,
    corpses: Vec<Corpse>,
    rng: ChaCha8Rng,
    nominal_frame_ms: f32,
}

impl DeathEffects {
    /// Creates an empty effect set.
    #[must_use]
    pub fn new(seed: u64, nominal_frame_ms: f32) -> Self {
        Self {
            bursts: Vec::new(),
            corpses: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            nominal_frame_ms,
        }
    }

    /// Live bursts, oldest first.
    #[must_use]
    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    /// Live corpses, oldest first.
    #[must_use]
    pub fn corpses(&self) -> &[Corpse] {
        &self.corpses
    }

    /// Returns `true` when nothing is playing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty() && self.corpses.is_empty()
    }

    /// Drops every effect.
    pub fn clear(&mut self) {
        self.bursts.clear();
        self.corpses.clear();
    }

    /// Starts the effects for a death.
    ///
    /// An empty phrase is replaced with one picked from [`DEATH_PHRASES`].
    pub fn spawn(&mut self, notice: &DeathNotice) {
        let at = notice.position;
        let phrase = if notice.phrase.is_empty() {
            DEATH_PHRASES[self.rng.gen_range(0..DEATH_PHRASES.len())].to_owned()
        } else {
            notice.phrase.clone()
        };

        let count = MIN_PARTICLES + self.rng.gen_range(0..EXTRA_PARTICLES);
        let rng = &mut self.rng;
        let particles = (0..count)
            .map(|_| Particle {
                position: at,
                size: 2.0 + rng.gen::<f32>() * 8.0,
                velocity: Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 10.0,
                gravity: 0.15 + rng.gen::<f32>() * 0.1,
            })
            .collect();

        self.bursts.push(Burst {
            particles,
            text: FloatingText {
                position: at + Vec2::new(0.0, TEXT_OFFSET_Y),
                speed_y: TEXT_SPEED_Y,
                text: phrase,
            },
            color: notice.color.clone(),
            age_ms: 0.0,
        });
        self.corpses.push(Corpse {
            position: at,
            speed_y: CORPSE_SPEED_Y,
            glyph: notice.glyph.clone(),
            rotation: 0.0,
            age_ms: 0.0,
        });
    }

    /// Advances every effect by `dt_ms` and drops expired ones.
    pub fn update(&mut self, dt_ms: f32) {
        if !dt_ms.is_finite() || dt_ms <= 0.0 {
            return;
        }
        let frames = dt_ms / self.nominal_frame_ms;

        self.bursts.retain_mut(|burst| {
            burst.age_ms += dt_ms;
            if burst.age_ms >= BURST_LIFETIME_MS {
                return false;
            }
            for particle in &mut burst.particles {
                particle.velocity.y += particle.gravity * frames;
                particle.position += particle.velocity * frames;
            }
            burst.text.position.y += burst.text.speed_y * frames;
            burst.text.speed_y *= TEXT_DRAG.powf(frames);
            true
        });

        self.corpses.retain_mut(|corpse| {
            corpse.age_ms += dt_ms;
            if corpse.age_ms >= CORPSE_LIFETIME_MS {
                return false;
            }
            corpse.speed_y += CORPSE_GRAVITY * frames;
            corpse.position.y += corpse.speed_y * frames;
            corpse.rotation += CORPSE_SPIN * frames;
            true
        });
    }
}
