//! JSON wire protocol spoken with the game server.
//!
//! Every message is a JSON object tagged by a `type` field. Inbound messages
//! decode into [`ServerMessage`] and convert into the transport-agnostic
//! [`InboundEvent`] the reconciler consumes. Outbound messages are
//! [`ClientMessage`]s wrapped in an [`Outgoing`] envelope that adds the
//! sender's `player_id` once it is known.
//!
//! # Example
//!
//! ```
//! use swatfly_core::protocol::{decode, ServerMessage};
//!
//! let message = decode(r#"{"type":"player_died","playerId":"p2"}"#).unwrap();
//! assert!(matches!(message, ServerMessage::PlayerDied(_)));
//!
//! assert!(decode(r#"{"type":"teleport"}"#).is_err());
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{AppearancePatch, EntityId};
use crate::error::ProtocolError;
use crate::reconcile::{InboundEvent, RosterEntry, ScoreEntry};

/// Every inbound `type` this client understands.
pub const KNOWN_SERVER_TYPES: [&str; 12] = [
    "init",
    "player_joined",
    "player_left",
    "position_update",
    "player_died",
    "player_respawned",
    "player_updated",
    "leaderboard_update",
    "hit_success",
    "hit_miss",
    "error",
    "pong",
];

// =============================================================================
// Inbound
// =============================================================================

/// A player as described in `init` rosters and `player_joined` messages.
///
/// Rosters use `id`, join messages use `playerId`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayload {
    /// Player identity.
    #[serde(alias = "id")]
    pub player_id: EntityId,
    /// Horizontal position.
    #[serde(default)]
    pub x: Option<f32>,
    /// Vertical position.
    #[serde(default)]
    pub y: Option<f32>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Glyph.
    #[serde(default)]
    pub emoji: Option<String>,
    /// Death phrase.
    #[serde(default)]
    pub death_phrase: Option<String>,
    /// Current score.
    #[serde(default)]
    pub score: Option<u32>,
}

/// Payload naming a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    /// Player identity.
    pub player_id: EntityId,
}

/// A player's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPayload {
    /// Player identity.
    pub player_id: EntityId,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// A player's changed customisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfoPayload {
    /// Player identity.
    pub player_id: EntityId,
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New glyph.
    #[serde(default)]
    pub emoji: Option<String>,
    /// New death phrase.
    #[serde(default)]
    pub death_phrase: Option<String>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// Player identity.
    #[serde(alias = "playerId")]
    pub id: EntityId,
    /// Score.
    pub score: u32,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Glyph.
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Full score snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPayload {
    /// Rows in server order.
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardRow>,
}

/// First message after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    /// Identity assigned to this client.
    pub player_id: EntityId,
    /// Starting horizontal position.
    pub x: f32,
    /// Starting vertical position.
    pub y: f32,
    /// Players already in the game.
    #[serde(default)]
    pub players: Vec<PlayerPayload>,
    /// Scores at join time.
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardRow>,
}

/// This client's click hit another player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitSuccessPayload {
    /// Player that was hit.
    pub target_id: EntityId,
    /// This client's score after the hit.
    pub new_score: u32,
}

/// A bare canvas point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// A server-side error report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Identity assignment plus initial roster.
    Init(InitPayload),
    /// Another player connected.
    PlayerJoined(PlayerPayload),
    /// A player disconnected.
    PlayerLeft(PlayerRef),
    /// A player moved.
    PositionUpdate(PositionPayload),
    /// A player was swatted.
    PlayerDied(PlayerRef),
    /// A player came back.
    PlayerRespawned(PositionPayload),
    /// A player changed their customisation.
    PlayerUpdated(PlayerInfoPayload),
    /// Score snapshot.
    LeaderboardUpdate(LeaderboardPayload),
    /// This client's click hit someone.
    HitSuccess(HitSuccessPayload),
    /// This client's click hit nobody.
    HitMiss(PointPayload),
    /// Server-side error.
    Error(ErrorPayload),
    /// Keep-alive reply.
    Pong,
}

/// Decodes one inbound message.
///
/// # Errors
///
/// - [`ProtocolError::Malformed`] if `text` is not JSON
/// - [`ProtocolError::MissingType`] if there is no string `type` field
/// - [`ProtocolError::UnknownType`] if the `type` is not in
///   [`KNOWN_SERVER_TYPES`]
/// - [`ProtocolError::InvalidPayload`] if the fields do not match the type
pub fn decode(text: &str) -> Result<ServerMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_owned();

    if !KNOWN_SERVER_TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

impl From<PlayerPayload> for RosterEntry {
    fn from(player: PlayerPayload) -> Self {
        let position = match (player.x, player.y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        };
        Self {
            id: player.player_id,
            position,
            appearance: AppearancePatch {
                glyph: player.emoji,
                name: player.name,
                colors: None,
                death_phrase: player.death_phrase,
            },
            score: player.score,
        }
    }
}

impl From<LeaderboardRow> for ScoreEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            id: row.id,
            score: row.score,
            appearance: AppearancePatch {
                glyph: row.emoji,
                name: row.name,
                colors: None,
                death_phrase: None,
            },
        }
    }
}

impl From<ServerMessage> for InboundEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Init(init) => Self::Init {
                local_id: init.player_id,
                position: Vec2::new(init.x, init.y),
                roster: init.players.into_iter().map(RosterEntry::from).collect(),
                leaderboard: init.leaderboard.into_iter().map(ScoreEntry::from).collect(),
            },
            ServerMessage::PlayerJoined(player) => Self::Join(player.into()),
            ServerMessage::PlayerLeft(player) => Self::Leave {
                id: player.player_id,
            },
            ServerMessage::PositionUpdate(update) => Self::Position {
                id: update.player_id,
                position: Vec2::new(update.x, update.y),
            },
            ServerMessage::PlayerDied(player) => Self::Died {
                id: player.player_id,
            },
            ServerMessage::PlayerRespawned(update) => Self::Respawned {
                id: update.player_id,
                position: Vec2::new(update.x, update.y),
            },
            ServerMessage::PlayerUpdated(info) => Self::AppearanceUpdated {
                id: info.player_id,
                patch: AppearancePatch {
                    glyph: info.emoji,
                    name: info.name,
                    colors: None,
                    death_phrase: info.death_phrase,
                },
            },
            ServerMessage::LeaderboardUpdate(board) => Self::Leaderboard {
                entries: board.leaderboard.into_iter().map(ScoreEntry::from).collect(),
            },
            ServerMessage::HitSuccess(hit) => Self::HitAccepted {
                target_id: hit.target_id,
                new_score: hit.new_score,
            },
            ServerMessage::HitMiss(point) => Self::HitMissed {
                position: Vec2::new(point.x, point.y),
            },
            ServerMessage::Error(error) => Self::ServerError {
                message: error.message,
            },
            ServerMessage::Pong => Self::Heartbeat,
        }
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// A message this client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The local player's customisation.
    PlayerInfo {
        /// Display name.
        name: String,
        /// Glyph.
        emoji: String,
        /// Death phrase.
        #[serde(rename = "deathPhrase")]
        death_phrase: String,
    },
    /// The local pointer position.
    PositionUpdate {
        /// Horizontal position.
        x: f32,
        /// Vertical position.
        y: f32,
    },
    /// A click to be hit-tested by the server.
    PlayerClick {
        /// Horizontal position.
        x: f32,
        /// Vertical position.
        y: f32,
    },
    /// A click on the central button.
    ButtonClick,
    /// Keep-alive.
    Ping,
}

impl ClientMessage {
    /// The wire `type` of this message.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlayerInfo { .. } => "player_info",
            Self::PositionUpdate { .. } => "position_update",
            Self::PlayerClick { .. } => "player_click",
            Self::ButtonClick => "button_click",
            Self::Ping => "ping",
        }
    }
}

/// An outbound message together with the sender identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outgoing {
    /// The message.
    #[serde(flatten)]
    pub message: ClientMessage,
    /// This client's identity, once the server has assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<EntityId>,
}

impl Outgoing {
    /// Wraps `message` with an optional sender identity.
    #[must_use]
    pub fn new(message: ClientMessage, player_id: Option<EntityId>) -> Self {
        Self { message, player_id }
    }

    /// Serializes the envelope to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails (for
    /// example a non-finite coordinate).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

// =============================================================================
// Tests
// =============================================================================
