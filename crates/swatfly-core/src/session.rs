//! A client session: world, reconciler and outbound path together.
//!
//! The [`Session`] is what the host talks to between frames. It accepts
//! raw inbound messages, pointer input and appearance changes, and decides
//! per mode what each one does:
//!
//! | input           | online                         | offline                          |
//! |-----------------|--------------------------------|----------------------------------|
//! | pointer move    | move local, throttled send     | move local                       |
//! | click on button | send central-action click      | local entity dies                |
//! | click elsewhere | send click for server hit-test | nearest hit entity dies, +1 score|
//! | message         | reconcile                      | ignored                          |
//!
//! Offline mode also owns respawning: every death schedules a respawn, and
//! dead autonomous entities, corpses included, may come back early.

use glam::Vec2;
use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::config::GameConfig;
use crate::entity::{Appearance, AppearancePatch, ControlMode, EntityId};
use crate::error::ConfigError;
use crate::link::{Outbound, Reconnector, SendOutcome, Transport};
use crate::notice::Dirty;
use crate::protocol::decode;
use crate::reconcile::{Applied, InboundEvent, Reconciler};
use crate::world::{World, OFFLINE_LOCAL_ID};

/// Whether the session is backed by a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Driven by server events.
    Online,
    /// Single-player with autonomous entities.
    Offline,
}

/// What a click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// There is no local entity yet.
    NoLocalEntity,
    /// Within the cooldown of the previous click.
    Debounced,
    /// The local entity is not alive.
    LocalNotAlive,
    /// Central-button click sent to the server (`true` if the transport was ready).
    CentralActionSent(bool),
    /// Offline central-button click: the local entity died.
    SelfSwat,
    /// Click sent to the server for hit detection.
    ClickSent(bool),
    /// Offline hit.
    Hit(EntityId),
    /// Offline miss.
    Missed,
}

/// One client session over a transport `T`.
#[derive(Debug)]
pub struct Session<T> {
    world: World,
    reconciler: Reconciler,
    outbound: Outbound<T>,
    reconnector: Reconnector,
    mode: Mode,
    connected: bool,
    last_click_ms: Option<f64>,
    since_ping_ms: f32,
}

impl<T: Transport> Session<T> {
    /// Creates an online session that waits for the server's `init`.
    ///
    /// `appearance` is the local player's customisation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails
    /// [`GameConfig::validate`].
    pub fn new(
        config: GameConfig,
        appearance: Appearance,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let outbound = Outbound::new(transport, config.timing.position_send_interval_ms);
        let reconnector = Reconnector::new(config.reconnect);
        Ok(Self {
            world: World::new(config),
            reconciler: Reconciler::new(appearance),
            outbound,
            reconnector,
            mode: Mode::Online,
            connected: false,
            last_click_ms: None,
            since_ping_ms: 0.0,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The session world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The session world, mutably.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The outbound path.
    #[must_use]
    pub fn outbound(&self) -> &Outbound<T> {
        &self.outbound
    }

    /// The outbound path, mutably.
    pub fn outbound_mut(&mut self) -> &mut Outbound<T> {
        &mut self.outbound
    }

    /// The reconnect tracker.
    #[must_use]
    pub fn reconnector(&self) -> &Reconnector {
        &self.reconnector
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns `true` while the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn online_and_identified(&self) -> bool {
        self.mode == Mode::Online && self.reconciler.is_active()
    }

    // =========================================================================
    // Offline mode
    // =========================================================================

    /// Switches to single-player: spawns the local entity at a random point
    /// and the configured number of autonomous entities.
    ///
    /// Replaces whatever the world held before.
    pub fn start_offline(&mut self) {
        info!("starting offline session");
        self.mode = Mode::Offline;
        self.connected = false;
        self.reconciler.reset();
        self.outbound.set_player_id(None);
        self.world.reset();

        let position = self.world.random_point();
        let appearance = self.reconciler.local_appearance().clone();
        self.world
            .spawn_local(EntityId::new(OFFLINE_LOCAL_ID), position, appearance);

        for _ in 0..self.world.config().autonomous.count {
            self.world.spawn_autonomous();
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Decodes and applies one raw server message.
    ///
    /// Undecodable messages are logged and dropped. Returns what applying
    /// the message did, or `None` if it was dropped.
    pub fn handle_message(&mut self, text: &str) -> Option<Applied> {
        match decode(text) {
            Ok(message) => Some(self.handle_event(message.into())),
            Err(err) => {
                warn!(error = %err, "dropping inbound message");
                None
            }
        }
    }

    /// Applies one decoded event.
    ///
    /// On initialization the local appearance is sent to the server.
    pub fn handle_event(&mut self, event: InboundEvent) -> Applied {
        if self.mode == Mode::Offline {
            debug!(kind = event.kind(), "event ignored in offline mode");
            return Applied::Ignored;
        }

        let applied = self.reconciler.apply(&mut self.world, event);
        if let Applied::Initialized { local_id } = &applied {
            self.outbound.set_player_id(Some(local_id.clone()));
            self.since_ping_ms = 0.0;
            let appearance = self.reconciler.local_appearance().clone();
            self.outbound.send_appearance(local_id, &appearance);
        }
        applied
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Moves the local entity toward `point`.
    ///
    /// Online, the position is also sent, subject to the throttle. Returns
    /// the send outcome, or `None` if nothing was sent (offline, or the
    /// local entity is absent or not alive).
    pub fn pointer_moved(&mut self, point: Vec2, now_ms: f64) -> Option<SendOutcome> {
        let local = self.world.registry.local_entity_mut()?;
        if !local.is_alive() {
            return None;
        }
        local.set_target(point);

        if self.online_and_identified() {
            Some(self.outbound.send_position(point, now_ms))
        } else {
            None
        }
    }

    /// Handles a click at `point`.
    pub fn clicked(&mut self, point: Vec2, now_ms: f64) -> ClickOutcome {
        let Some(local) = self.world.registry.local_entity() else {
            return ClickOutcome::NoLocalEntity;
        };
        let local_id = local.id().clone();
        let local_alive = local.is_alive();

        let cooldown = f64::from(self.world.config().timing.click_cooldown_ms);
        if let Some(last) = self.last_click_ms {
            if now_ms - last < cooldown {
                return ClickOutcome::Debounced;
            }
        }
        self.last_click_ms = Some(now_ms);

        if !local_alive {
            return ClickOutcome::LocalNotAlive;
        }

        if self.world.config().central_button.contains(point) {
            return match self.mode {
                Mode::Online => {
                    ClickOutcome::CentralActionSent(self.outbound.send_central_action_click())
                }
                Mode::Offline => {
                    debug!("central button pressed offline");
                    self.kill_offline(&local_id);
                    ClickOutcome::SelfSwat
                }
            };
        }

        match self.mode {
            Mode::Online => ClickOutcome::ClickSent(self.outbound.send_click(point)),
            Mode::Offline => self.hit_test_offline(&local_id, point),
        }
    }

    fn hit_test_offline(&mut self, local_id: &EntityId, point: Vec2) -> ClickOutcome {
        let target = self
            .world
            .registry
            .iter()
            .filter(|e| e.id() != local_id && e.is_alive() && e.hit_test(point))
            .min_by(|a, b| {
                a.position()
                    .distance_squared(point)
                    .total_cmp(&b.position().distance_squared(point))
            })
            .map(|e| e.id().clone());

        let Some(target) = target else {
            trace!("offline click missed at {point}");
            return ClickOutcome::Missed;
        };

        self.kill_offline(&target);
        if let Some(local) = self.world.registry.local_entity_mut() {
            local.increment_score();
        }
        self.world.notices.mark(Dirty::SCOREBOARD);
        ClickOutcome::Hit(target)
    }

    fn kill_offline(&mut self, id: &EntityId) {
        if self.world.kill(id, None) {
            let delay = self.world.config().timing.respawn_delay_ms;
            self.world.schedule_respawn(id, delay);
        }
    }

    /// Changes the local player's customisation.
    ///
    /// Applies to the local entity (if any) and to every future
    /// re-initialization, refreshes the cursor, and tells the server when
    /// online.
    pub fn change_appearance(&mut self, patch: &AppearancePatch) {
        self.reconciler.update_local_appearance(patch);
        let Some(local) = self.world.registry.local_entity_mut() else {
            return;
        };
        local.apply_appearance(patch);
        let id = local.id().clone();
        let appearance = local.appearance().clone();
        self.world.notices.mark(Dirty::CURSOR | Dirty::SCOREBOARD);

        if self.online_and_identified() {
            self.outbound.send_appearance(&id, &appearance);
        }
    }

    // =========================================================================
    // Per frame
    // =========================================================================

    /// Session bookkeeping for a frame of `dt_ms`: advances the clock, fires
    /// due offline respawns, and sends keep-alives.
    ///
    /// Called by the simulation after entities have been ticked.
    pub fn advance(&mut self, dt_ms: f32) {
        self.world.advance_clock(dt_ms);

        match self.mode {
            Mode::Offline => self.advance_offline(),
            Mode::Online => self.advance_online(dt_ms),
        }
    }

    fn advance_offline(&mut self) {
        for id in self.world.take_due_respawns() {
            let position = self.world.random_point();
            self.world.respawn(&id, position);
        }

        let chance = self.world.config().autonomous.respawn_chance_per_frame;
        let dead: Vec<EntityId> = self
            .world
            .registry
            .iter()
            .filter(|e| e.mode() == ControlMode::Autonomous && !e.is_alive())
            .map(|e| e.id().clone())
            .collect();

        for id in dead {
            if self.world.rng().gen_bool(chance) {
                let position = self.world.random_point_clear_of_button();
                trace!(%id, "early respawn");
                self.world.respawn(&id, position);
            }
        }
    }

    fn advance_online(&mut self, dt_ms: f32) {
        if !self.connected || !self.reconciler.is_active() || !dt_ms.is_finite() {
            return;
        }
        self.since_ping_ms += dt_ms.max(0.0);
        if self.since_ping_ms >= self.world.config().timing.ping_interval_ms {
            self.since_ping_ms = 0.0;
            self.outbound.send_ping();
        }
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// The transport opened.
    pub fn connection_opened(&mut self) {
        info!("connection opened");
        self.connected = true;
        self.since_ping_ms = 0.0;
        self.reconnector.on_open();
    }

    /// The transport closed with `code`.
    ///
    /// Returns the delay before the host should reconnect, or `None` if it
    /// should not.
    pub fn connection_closed(&mut self, code: u16) -> Option<f32> {
        info!(code, "connection closed");
        self.connected = false;
        if self.mode == Mode::Offline {
            return None;
        }
        self.reconnector.on_closed(code)
    }

    /// Connecting failed outright. Same contract as
    /// [`Session::connection_closed`].
    pub fn connection_failed(&mut self) -> Option<f32> {
        self.connected = false;
        self.reconnector.next_attempt()
    }

    /// Tears the session down: forgets every entity and the local identity.
    pub fn teardown(&mut self) {
        info!("session torn down");
        self.connected = false;
        self.reconciler.reset();
        self.outbound.set_player_id(None);
        self.world.reset();
    }
}

// =============================================================================
// Tests
// =============================================================================
