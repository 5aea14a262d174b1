//! Test helpers: recording collaborators and factory functions.
//!
//! The recording types capture every call the core makes on its seams so
//! tests can assert on what was sent, presented and drawn.

use glam::Vec2;

use crate::config::GameConfig;
use crate::effects::DeathEffects;
use crate::entity::{Appearance, Entity, EntityId};
use crate::link::Transport;
use crate::notice::DeathNotice;
use crate::protocol::{ClientMessage, Outgoing};
use crate::render::{Canvas, Presenter, Sprite};
use crate::session::Session;
use crate::simulation::Simulation;

// =============================================================================
// Recording Collaborators
// =============================================================================

/// A transport that records every message, optionally refusing them.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    /// Messages accepted so far.
    pub sent: Vec<Outgoing>,
    /// When `true`, every send fails.
    pub offline: bool,
}

impl RecordingTransport {
    /// Kinds of the messages sent so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent.iter().map(|o| o.message.kind()).collect()
    }

    /// The last message sent, if any.
    pub fn last(&self) -> Option<&ClientMessage> {
        self.sent.last().map(|o| &o.message)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, message: &Outgoing) -> bool {
        if self.offline {
            return false;
        }
        self.sent.push(message.clone());
        true
    }
}

/// One presenter call.
#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    /// A death effect at a position with a phrase.
    Death {
        /// Entity that died.
        id: EntityId,
        /// Where.
        position: Vec2,
        /// Phrase.
        phrase: String,
    },
    /// Scoreboard as `(id, score)` rows in rank order.
    Scoreboard(Vec<(String, u32)>),
    /// Cursor glyph.
    Cursor(String),
    /// Death overlay shown.
    OverlayShown(String),
    /// Death overlay hidden.
    OverlayHidden,
}

/// A presenter that records every call.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    /// Calls so far.
    pub calls: Vec<Presented>,
}

impl RecordingPresenter {
    /// The most recent scoreboard, if any.
    pub fn last_scoreboard(&self) -> Option<&[(String, u32)]> {
        self.calls.iter().rev().find_map(|c| match c {
            Presented::Scoreboard(rows) => Some(rows.as_slice()),
            _ => None,
        })
    }

    /// Number of death effects presented.
    pub fn deaths(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Presented::Death { .. }))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn death_effect(&mut self, notice: &DeathNotice) {
        self.calls.push(Presented::Death {
            id: notice.id.clone(),
            position: notice.position,
            phrase: notice.phrase.clone(),
        });
    }

    fn scoreboard(&mut self, ranked: &[&Entity]) {
        let rows = ranked
            .iter()
            .map(|e| (e.id().as_str().to_owned(), e.score()))
            .collect();
        self.calls.push(Presented::Scoreboard(rows));
    }

    fn cursor_glyph(&mut self, glyph: &str) {
        self.calls.push(Presented::Cursor(glyph.to_owned()));
    }

    fn show_death_overlay(&mut self, phrase: &str, _respawn_in_ms: Option<f32>) {
        self.calls.push(Presented::OverlayShown(phrase.to_owned()));
    }

    fn hide_death_overlay(&mut self) {
        self.calls.push(Presented::OverlayHidden);
    }
}

/// A canvas that records what each frame drew.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    /// Frames cleared so far.
    pub clears: usize,
    /// Sprites drawn in the latest frame as `(id, position)`.
    pub sprites: Vec<(String, Vec2)>,
    /// Bursts live at the latest effects pass.
    pub bursts: usize,
}

impl RecordingCanvas {
    /// Ids drawn in the latest frame.
    pub fn drawn_ids(&self) -> Vec<&str> {
        self.sprites.iter().map(|(id, _)| id.as_str()).collect()
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self, _size: Vec2) {
        self.clears += 1;
        self.sprites.clear();
    }

    fn draw_background(&mut self, _size: Vec2, _time_ms: f64) {}

    fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
        self.sprites
            .push((sprite.id.as_str().to_owned(), sprite.position));
    }

    fn draw_effects(&mut self, effects: &DeathEffects) {
        self.bursts = effects.bursts().len();
    }
}

// =============================================================================
// Factories
// =============================================================================

/// An 800x600 config with a fixed seed.
pub fn test_config() -> GameConfig {
    GameConfig::with_canvas(800.0, 600.0).with_seed(42)
}

/// A connected online session that has not been initialized yet.
pub fn online_session() -> Session<RecordingTransport> {
    let mut session = Session::new(
        test_config(),
        Appearance::named("Ann", "🐝").with_death_phrase("Argh!"),
        RecordingTransport::default(),
    )
    .unwrap();
    session.connection_opened();
    session
}

/// An online simulation with a recording presenter.
pub fn online_simulation() -> Simulation<RecordingTransport, RecordingPresenter> {
    Simulation::new(online_session(), RecordingPresenter::default())
}

/// Runs `frames` frames of 16 ms starting at `start_ms`, returning the next
/// timestamp.
pub fn run_frames<T: Transport>(
    sim: &mut Simulation<T, RecordingPresenter>,
    canvas: &mut RecordingCanvas,
    start_ms: f64,
    frames: usize,
) -> f64 {
    let mut t = start_ms;
    for _ in 0..frames {
        sim.frame(t, canvas);
        t += 16.0;
    }
    t
}

/// Feeds raw server messages to the session.
pub fn feed<T: Transport>(session: &mut Session<T>, messages: &[&str]) {
    for message in messages {
        session.handle_message(message);
    }
}

/// Position of entity `id`.
///
/// # Panics
///
/// Panics if the entity does not exist.
pub fn position_of<T: Transport>(session: &Session<T>, id: &str) -> Vec2 {
    session
        .world()
        .registry
        .find(&EntityId::new(id))
        .map(Entity::position)
        .unwrap_or_else(|| panic!("no entity {id}"))
}
