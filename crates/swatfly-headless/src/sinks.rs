//! Collaborators for running the core without a display or a server.

use glam::Vec2;
use swatfly_core::effects::DeathEffects;
use swatfly_core::link::Transport;
use swatfly_core::notice::DeathNotice;
use swatfly_core::protocol::Outgoing;
use swatfly_core::render::{Canvas, Presenter, Sprite};
use swatfly_core::Entity;
use tracing::{debug, info, warn};

/// Transport that logs outbound messages instead of sending them.
#[derive(Debug, Default)]
pub struct LogTransport {
    /// Messages handed over so far.
    pub sent: usize,
}

impl Transport for LogTransport {
    fn send(&mut self, message: &Outgoing) -> bool {
        match message.encode() {
            Ok(text) => {
                debug!(target: "swatfly::wire", "-> {text}");
                self.sent += 1;
                true
            }
            Err(err) => {
                warn!(error = %err, "could not encode outbound message");
                false
            }
        }
    }
}

/// Presenter that logs what a UI would show.
#[derive(Debug, Default)]
pub struct LogPresenter {
    /// Death effects played.
    pub deaths: usize,
    /// Latest scoreboard as `(name, score)`.
    pub scoreboard: Vec<(String, u32)>,
}

impl Presenter for LogPresenter {
    fn death_effect(&mut self, notice: &DeathNotice) {
        self.deaths += 1;
        info!(id = %notice.id, phrase = %notice.phrase, "{} swatted at {}", notice.glyph, notice.position);
    }

    fn scoreboard(&mut self, ranked: &[&Entity]) {
        self.scoreboard = ranked
            .iter()
            .map(|e| (e.appearance().name_or_default(e.id()), e.score()))
            .collect();
        debug!(rows = self.scoreboard.len(), "scoreboard updated");
    }

    fn cursor_glyph(&mut self, glyph: &str) {
        debug!(glyph, "cursor glyph");
    }

    fn show_death_overlay(&mut self, phrase: &str, respawn_in_ms: Option<f32>) {
        info!(phrase, ?respawn_in_ms, "local player died");
    }

    fn hide_death_overlay(&mut self) {
        info!("local player respawned");
    }
}

/// Canvas that only counts what would be drawn.
#[derive(Debug, Default)]
pub struct CountingCanvas {
    /// Sprites drawn over the whole run.
    pub sprites: u64,
    /// Sprites drawn in the latest frame.
    pub last_frame_sprites: usize,
    /// Most bursts live at once.
    pub peak_bursts: usize,
}

impl Canvas for CountingCanvas {
    fn clear(&mut self, _size: Vec2) {
        self.last_frame_sprites = 0;
    }

    fn draw_background(&mut self, _size: Vec2, _time_ms: f64) {}

    fn draw_sprite(&mut self, _sprite: &Sprite<'_>) {
        self.sprites += 1;
        self.last_frame_sprites += 1;
    }

    fn draw_effects(&mut self, effects: &DeathEffects) {
        self.peak_bursts = self.peak_bursts.max(effects.bursts().len());
    }
}
