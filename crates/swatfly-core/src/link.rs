//! Outbound path to the game server.
//!
//! This module provides:
//! - [`Transport`]: the seam to whatever actually carries bytes
//! - [`Outbound`]: typed, fire-and-forget send calls with the position
//!   throttle applied
//! - [`Reconnector`]: exponential reconnect backoff
//!
//! Sends never queue and never retry. A send to a transport that is not
//! ready returns `false` and the message is lost; the next periodic send
//! carries fresher state anyway.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::entity::{Appearance, EntityId};
use crate::protocol::{ClientMessage, Outgoing};

/// WebSocket close code for an intentional disconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

// =============================================================================
// Transport
// =============================================================================

/// Carries outbound messages to the server.
pub trait Transport {
    /// Sends one message. Returns `false` if the transport was not ready.
    fn send(&mut self, message: &Outgoing) -> bool;
}

/// A transport that is never ready. Used in offline mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl Transport for Disconnected {
    fn send(&mut self, message: &Outgoing) -> bool {
        trace!(kind = message.message.kind(), "send while disconnected");
        false
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message: &Outgoing) -> bool {
        (**self).send(message)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: &Outgoing) -> bool {
        (**self).send(message)
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Result of a throttled position send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the transport.
    Sent,
    /// The transport was not ready.
    NotReady,
    /// Dropped by the throttle; a later send will carry a fresher position.
    Throttled,
}

/// Typed send calls over a [`Transport`].
#[derive(Debug)]
pub struct Outbound<T> {
    transport: T,
    player_id: Option<EntityId>,
    position_interval_ms: f64,
    last_position_ms: Option<f64>,
}

impl<T: Transport> Outbound<T> {
    /// Wraps `transport`, sending positions at most once per
    /// `position_interval_ms`.
    #[must_use]
    pub fn new(transport: T, position_interval_ms: f32) -> Self {
        Self {
            transport,
            player_id: None,
            position_interval_ms: f64::from(position_interval_ms),
            last_position_ms: None,
        }
    }

    /// The wrapped transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The wrapped transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwraps the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Identity stamped on every outbound message.
    #[must_use]
    pub fn player_id(&self) -> Option<&EntityId> {
        self.player_id.as_ref()
    }

    /// Sets the identity stamped on outbound messages.
    pub fn set_player_id(&mut self, id: Option<EntityId>) {
        self.player_id = id;
    }

    fn send(&mut self, message: ClientMessage) -> bool {
        let kind = message.kind();
        let sent = self
            .transport
            .send(&Outgoing::new(message, self.player_id.clone()));
        if !sent {
            debug!(kind, "transport not ready, message dropped");
        }
        sent
    }

    /// Sends the local player's customisation, resolving missing fields to
    /// their defaults.
    pub fn send_appearance(&mut self, id: &EntityId, appearance: &Appearance) -> bool {
        self.send(ClientMessage::PlayerInfo {
            name: appearance.name_or_default(id),
            emoji: appearance.glyph_or_default().to_owned(),
            death_phrase: appearance.death_phrase_or_default().to_owned(),
        })
    }

    /// Sends the local position unless one was sent within the interval.
    ///
    /// `now_ms` is the host timestamp of the pointer event.
    pub fn send_position(&mut self, position: Vec2, now_ms: f64) -> SendOutcome {
        if let Some(last) = self.last_position_ms {
            if now_ms - last <= self.position_interval_ms {
                return SendOutcome::Throttled;
            }
        }
        self.last_position_ms = Some(now_ms);

        if self.send(ClientMessage::PositionUpdate {
            x: position.x,
            y: position.y,
        }) {
            SendOutcome::Sent
        } else {
            SendOutcome::NotReady
        }
    }

    /// Sends a click for server-side hit detection.
    pub fn send_click(&mut self, position: Vec2) -> bool {
        self.send(ClientMessage::PlayerClick {
            x: position.x,
            y: position.y,
        })
    }

    /// Sends a click on the central button.
    pub fn send_central_action_click(&mut self) -> bool {
        self.send(ClientMessage::ButtonClick)
    }

    /// Sends a keep-alive.
    pub fn send_ping(&mut self) -> bool {
        self.send(ClientMessage::Ping)
    }
}

// =============================================================================
// Reconnection
// =============================================================================

/// Backoff policy for reconnecting a dropped transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt, in milliseconds.
    pub base_delay_ms: f32,
    /// Multiplier applied to the delay for each further attempt.
    pub factor: f32,
    /// Attempts made before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 2000.0,
            factor: 1.5,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> f32 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.base_delay_ms * self.factor.powi(exponent)
    }
}

/// Tracks reconnect attempts for one connection.
#[derive(Debug, Clone, Default)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Reconnector {
    /// Creates a reconnector with no attempts made.
    #[must_use]
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Attempts made since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` once every attempt has been used.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Resets the attempt counter after a successful open.
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Handles a closed connection.
    ///
    /// Returns the delay before the next attempt, or `None` if the close was
    /// intentional or every attempt has been used.
    pub fn on_closed(&mut self, code: u16) -> Option<f32> {
        if code == NORMAL_CLOSURE {
            debug!("clean close, not reconnecting");
            return None;
        }
        self.next_attempt()
    }

    /// Schedules the next attempt, e.g. after a failed connect.
    pub fn next_attempt(&mut self) -> Option<f32> {
        if self.exhausted() {
            info!(attempts = self.attempts, "reconnect attempts exhausted, giving up");
            return None;
        }
        self.attempts += 1;
        let delay = self.policy.delay_for(self.attempts);
        info!(
            attempt = self.attempts,
            max = self.policy.max_attempts,
            delay_ms = delay,
            "reconnecting"
        );
        Some(delay)
    }
}

// =============================================================================
// Tests
// =============================================================================
