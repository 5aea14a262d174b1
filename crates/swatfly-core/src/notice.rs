//! Presentation notices accumulated between frames.
//!
//! Reconciliation, input handling and entity operations never call a
//! presenter directly. They record what happened in [`Notices`], and the
//! simulation's render step drains the queue once per frame with
//! [`Notices::take`].

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

bitflags! {
    /// Presentation state that must be refreshed on the next render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Dirty: u8 {
        /// A score or the roster changed; redraw the scoreboard.
        const SCOREBOARD = 1 << 0;
        /// The local entity's glyph changed; refresh the cursor.
        const CURSOR = 1 << 1;
    }
}

/// Everything a presenter needs to play a death effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathNotice {
    /// Entity that died.
    pub id: EntityId,
    /// Where it died.
    pub position: Vec2,
    /// Primary colour of the entity, used to tint particles.
    pub color: String,
    /// Glyph drawn on the corpse.
    pub glyph: String,
    /// Phrase floated above the corpse.
    pub phrase: String,
    /// `true` if the local entity died.
    pub local: bool,
}

/// Change to the local death overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayChange {
    /// Show the overlay with the local entity's phrase.
    Show {
        /// Phrase to display.
        phrase: String,
        /// Time until respawn in milliseconds, if known.
        respawn_in_ms: Option<f32>,
    },
    /// Hide the overlay.
    Hide,
}

/// Notices drained in one render step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticeBatch {
    /// Deaths in the order they happened.
    pub deaths: Vec<DeathNotice>,
    /// Overlay changes in the order they happened.
    pub overlay: Vec<OverlayChange>,
    /// Presentation state to refresh.
    pub dirty: Dirty,
}

impl NoticeBatch {
    /// Returns `true` if there is nothing to present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deaths.is_empty() && self.overlay.is_empty() && self.dirty.is_empty()
    }
}

/// Queue of pending presentation notices.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    pending: NoticeBatch,
}

impl Notices {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a death.
    pub fn death(&mut self, notice: DeathNotice) {
        self.pending.deaths.push(notice);
    }

    /// Records an overlay change.
    pub fn overlay(&mut self, change: OverlayChange) {
        self.pending.overlay.push(change);
    }

    /// Marks presentation state dirty.
    pub fn mark(&mut self, dirty: Dirty) {
        self.pending.dirty |= dirty;
    }

    /// Returns the dirty flags without draining them.
    #[must_use]
    pub fn dirty(&self) -> Dirty {
        self.pending.dirty
    }

    /// Number of undrained death notices.
    #[must_use]
    pub fn pending_deaths(&self) -> usize {
        self.pending.deaths.len()
    }

    /// Discards every pending notice.
    pub fn clear(&mut self) {
        self.pending = NoticeBatch::default();
    }

    /// Drains every pending notice.
    pub fn take(&mut self) -> NoticeBatch {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: &str) -> DeathNotice {
        DeathNotice {
            id: EntityId::new(id),
            position: Vec2::ZERO,
            color: "#eb4d4b".to_owned(),
            glyph: "🪰".to_owned(),
            phrase: "SPLAT!".to_owned(),
            local: false,
        }
    }

    #[test]
    fn take_drains_in_order() {
        let mut notices = Notices::new();
        notices.death(notice("a"));
        notices.death(notice("b"));
        notices.mark(Dirty::SCOREBOARD);

        let batch = notices.take();
        let ids: Vec<_> = batch.deaths.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(batch.dirty, Dirty::SCOREBOARD);

        assert!(notices.take().is_empty());
    }

    #[test]
    fn dirty_flags_accumulate() {
        let mut notices = Notices::new();
        notices.mark(Dirty::SCOREBOARD);
        notices.mark(Dirty::CURSOR);
        notices.mark(Dirty::SCOREBOARD);
        assert_eq!(notices.dirty(), Dirty::SCOREBOARD | Dirty::CURSOR);
    }
}
