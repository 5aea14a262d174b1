//! Reconciliation of inbound network events with the entity registry.
//!
//! The [`Reconciler`] is a two-state machine:
//!
//! ```text
//! uninitialized --init--> active --(join | leave | position | died |
//!                           ^        respawned | appearance | leaderboard |
//!                           |        hit)--> active
//!                           +--init (re-initialization clears the world)
//! ```
//!
//! Two rules hold for every event:
//!
//! - A message about the local identity never creates or touches a remote
//!   entity. Local movement and appearance are input-driven.
//! - A message about an identity that has not been seen yet materializes a
//!   placeholder remote entity instead of being dropped, so events may
//!   arrive in any order. `died` is the exception: killing an entity
//!   nobody has seen is dropped.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use swatfly_core::config::GameConfig;
//! use swatfly_core::entity::{Appearance, EntityId};
//! use swatfly_core::reconcile::{Applied, InboundEvent, Reconciler};
//! use swatfly_core::world::World;
//!
//! let mut world = World::new(GameConfig::default());
//! let mut reconciler = Reconciler::new(Appearance::named("Ann", "🐝"));
//!
//! let applied = reconciler.apply(
//!     &mut world,
//!     InboundEvent::Init {
//!         local_id: EntityId::new("p1"),
//!         position: Vec2::new(100.0, 100.0),
//!         roster: Vec::new(),
//!         leaderboard: Vec::new(),
//!     },
//! );
//!
//! assert!(matches!(applied, Applied::Initialized { .. }));
//! assert_eq!(world.registry.local_id(), Some(&EntityId::new("p1")));
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::entity::{Appearance, AppearancePatch, EntityId};
use crate::notice::Dirty;
use crate::world::World;

// =============================================================================
// Events
// =============================================================================

/// A player as listed in a roster or announced by a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Player identity.
    pub id: EntityId,
    /// Position, if the message carried one.
    pub position: Option<Vec2>,
    /// Customisation carried by the message.
    pub appearance: AppearancePatch,
    /// Score, if the message carried one.
    pub score: Option<u32>,
}

impl RosterEntry {
    /// An entry with only an identity and a position.
    #[must_use]
    pub fn at(id: impl Into<EntityId>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            appearance: AppearancePatch::default(),
            score: None,
        }
    }
}

/// One row of a score snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Player identity.
    pub id: EntityId,
    /// Authoritative score.
    pub score: u32,
    /// Customisation used if the player has to be materialized.
    pub appearance: AppearancePatch,
}

impl ScoreEntry {
    /// An entry with only an identity and a score.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, score: u32) -> Self {
        Self {
            id: id.into(),
            score,
            appearance: AppearancePatch::default(),
        }
    }
}

/// A decoded, transport-agnostic inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// The server assigned this client its identity.
    Init {
        /// Identity of the local entity.
        local_id: EntityId,
        /// Starting position of the local entity.
        position: Vec2,
        /// Players already present.
        roster: Vec<RosterEntry>,
        /// Scores at join time.
        leaderboard: Vec<ScoreEntry>,
    },
    /// Another player connected.
    Join(RosterEntry),
    /// A player disconnected.
    Leave {
        /// Player identity.
        id: EntityId,
    },
    /// A player moved.
    Position {
        /// Player identity.
        id: EntityId,
        /// New position.
        position: Vec2,
    },
    /// A player was swatted.
    Died {
        /// Player identity.
        id: EntityId,
    },
    /// A player came back.
    Respawned {
        /// Player identity.
        id: EntityId,
        /// Respawn position.
        position: Vec2,
    },
    /// A player changed their customisation.
    AppearanceUpdated {
        /// Player identity.
        id: EntityId,
        /// Changed fields.
        patch: AppearancePatch,
    },
    /// Full score snapshot.
    Leaderboard {
        /// Rows in server order.
        entries: Vec<ScoreEntry>,
    },
    /// This client's click hit someone.
    HitAccepted {
        /// Player that was hit.
        target_id: EntityId,
        /// This client's score after the hit.
        new_score: u32,
    },
    /// This client's click hit nobody.
    HitMissed {
        /// Where the click landed.
        position: Vec2,
    },
    /// The server reported an error.
    ServerError {
        /// Description.
        message: String,
    },
    /// Keep-alive reply.
    Heartbeat,
}

impl InboundEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Join(_) => "join",
            Self::Leave { .. } => "leave",
            Self::Position { .. } => "position",
            Self::Died { .. } => "died",
            Self::Respawned { .. } => "respawned",
            Self::AppearanceUpdated { .. } => "appearance_updated",
            Self::Leaderboard { .. } => "leaderboard",
            Self::HitAccepted { .. } => "hit_accepted",
            Self::HitMissed { .. } => "hit_missed",
            Self::ServerError { .. } => "server_error",
            Self::Heartbeat => "heartbeat",
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// State of a session's reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReconcileState {
    /// Waiting for `init`.
    #[default]
    Uninitialized,
    /// Initialized with a local identity.
    Active {
        /// Identity of the local entity.
        local_id: EntityId,
    },
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The session became (or was re-) initialized.
    Initialized {
        /// Identity of the local entity.
        local_id: EntityId,
    },
    /// The world changed.
    Changed,
    /// The event was valid but had nothing to change.
    Ignored,
}

/// Applies inbound events to a [`World`].
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    state: ReconcileState,
    local_appearance: Appearance,
}

impl Reconciler {
    /// Creates an uninitialized reconciler. `local_appearance` is given to
    /// the local entity when `init` arrives.
    #[must_use]
    pub fn new(local_appearance: Appearance) -> Self {
        Self {
            state: ReconcileState::Uninitialized,
            local_appearance,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ReconcileState {
        &self.state
    }

    /// Returns `true` once `init` has been applied.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, ReconcileState::Active { .. })
    }

    /// Identity of the local entity, once initialized.
    #[must_use]
    pub fn local_id(&self) -> Option<&EntityId> {
        match &self.state {
            ReconcileState::Active { local_id } => Some(local_id),
            ReconcileState::Uninitialized => None,
        }
    }

    /// Appearance the local entity is (re)created with.
    #[must_use]
    pub fn local_appearance(&self) -> &Appearance {
        &self.local_appearance
    }

    /// Merges `patch` into the stored local appearance.
    pub fn update_local_appearance(&mut self, patch: &AppearancePatch) -> bool {
        self.local_appearance.merge(patch)
    }

    /// Forgets the local identity.
    pub fn reset(&mut self) {
        self.state = ReconcileState::Uninitialized;
    }

    fn is_local(&self, id: &EntityId) -> bool {
        self.local_id() == Some(id)
    }

    /// Applies one event.
    ///
    /// Never fails: events that cannot apply are logged and reported as
    /// [`Applied::Ignored`].
    pub fn apply(&mut self, world: &mut World, event: InboundEvent) -> Applied {
        trace!(kind = event.kind(), "applying event");

        if let InboundEvent::Init {
            local_id,
            position,
            roster,
            leaderboard,
        } = event
        {
            return self.initialize(world, local_id, position, roster, &leaderboard);
        }

        if !self.is_active() {
            debug!(kind = event.kind(), "event before init dropped");
            return Applied::Ignored;
        }

        match event {
            InboundEvent::Init { .. } => Applied::Ignored,
            InboundEvent::Join(entry) => self.join(world, entry),
            InboundEvent::Leave { id } => self.leave(world, &id),
            InboundEvent::Position { id, position } => self.position(world, &id, position),
            InboundEvent::Died { id } => {
                if world.kill(&id, None) {
                    Applied::Changed
                } else {
                    debug!(%id, "died for unknown or dead entity dropped");
                    Applied::Ignored
                }
            }
            InboundEvent::Respawned { id, position } => self.respawned(world, &id, position),
            InboundEvent::AppearanceUpdated { id, patch } => self.appearance(world, &id, &patch),
            InboundEvent::Leaderboard { entries } => {
                self.leaderboard(world, &entries);
                Applied::Changed
            }
            InboundEvent::HitAccepted {
                target_id,
                new_score,
            } => {
                trace!(%target_id, new_score, "hit accepted");
                match world.registry.local_entity_mut() {
                    Some(local) => {
                        local.set_score(new_score);
                        world.notices.mark(Dirty::SCOREBOARD);
                        Applied::Changed
                    }
                    None => Applied::Ignored,
                }
            }
            InboundEvent::HitMissed { position } => {
                trace!("click missed at {position}");
                Applied::Ignored
            }
            InboundEvent::ServerError { message } => {
                warn!(%message, "server reported an error");
                Applied::Ignored
            }
            InboundEvent::Heartbeat => Applied::Ignored,
        }
    }

    fn initialize(
        &mut self,
        world: &mut World,
        local_id: EntityId,
        position: Vec2,
        roster: Vec<RosterEntry>,
        leaderboard: &[ScoreEntry],
    ) -> Applied {
        if self.is_active() {
            info!(%local_id, "re-initializing session");
            world.reset();
        } else {
            info!(%local_id, "session initialized");
        }

        world.spawn_local(local_id.clone(), position, self.local_appearance.clone());
        self.state = ReconcileState::Active {
            local_id: local_id.clone(),
        };

        for entry in roster {
            if entry.id == local_id {
                debug!("local identity in roster skipped");
                continue;
            }
            if world.registry.contains(&entry.id) {
                continue;
            }
            let entity = world.upsert_remote(&entry.id, entry.position);
            entity.apply_appearance(&entry.appearance);
            if let Some(score) = entry.score {
                entity.set_score(score);
            }
        }

        self.leaderboard(world, leaderboard);
        Applied::Initialized { local_id }
    }

    fn join(&self, world: &mut World, entry: RosterEntry) -> Applied {
        if self.is_local(&entry.id) {
            debug!("join for local identity ignored");
            return Applied::Ignored;
        }
        if world.registry.contains(&entry.id) {
            trace!(id = %entry.id, "join for known entity ignored");
            return Applied::Ignored;
        }

        let entity = world.upsert_remote(&entry.id, entry.position);
        entity.apply_appearance(&entry.appearance);
        if let Some(score) = entry.score {
            entity.set_score(score);
        }
        debug!(id = %entry.id, "player joined");
        world.notices.mark(Dirty::SCOREBOARD);
        Applied::Changed
    }

    fn leave(&self, world: &mut World, id: &EntityId) -> Applied {
        if self.is_local(id) {
            debug!("leave for local identity ignored");
            return Applied::Ignored;
        }
        world.cancel_respawn(id);
        if world.registry.remove(id).is_some() {
            debug!(%id, "player left");
            world.notices.mark(Dirty::SCOREBOARD);
            Applied::Changed
        } else {
            Applied::Ignored
        }
    }

    fn position(&self, world: &mut World, id: &EntityId, position: Vec2) -> Applied {
        if self.is_local(id) {
            return Applied::Ignored;
        }
        world.upsert_remote(id, Some(position)).set_target(position);
        Applied::Changed
    }

    fn respawned(&self, world: &mut World, id: &EntityId, position: Vec2) -> Applied {
        if !self.is_local(id) {
            world.upsert_remote(id, Some(position));
        }
        if world.respawn(id, position) {
            Applied::Changed
        } else {
            Applied::Ignored
        }
    }

    fn appearance(&self, world: &mut World, id: &EntityId, patch: &AppearancePatch) -> Applied {
        if self.is_local(id) {
            debug!("appearance update for local identity ignored");
            return Applied::Ignored;
        }
        if world.upsert_remote(id, None).apply_appearance(patch) {
            world.notices.mark(Dirty::SCOREBOARD);
        }
        Applied::Changed
    }

    fn leaderboard(&self, world: &mut World, entries: &[ScoreEntry]) {
        for entry in entries {
            if self.is_local(&entry.id) {
                if let Some(local) = world.registry.local_entity_mut() {
                    local.set_score(entry.score);
                }
                continue;
            }

            let created = !world.registry.contains(&entry.id);
            let entity = world.upsert_remote(&entry.id, None);
            if created {
                entity.apply_appearance(&entry.appearance);
            }
            entity.set_score(entry.score);
        }
        world.notices.mark(Dirty::SCOREBOARD);
    }
}

// =============================================================================
// Tests
// =============================================================================
