//! # Swatfly Core
//!
//! Client-side core of the swat-the-fly game: entity reconciliation and the
//! per-frame simulation loop.
//!
//! ## Architecture
//!
//! - **Entities** ([`entity`]): one avatar type tagged by [`ControlMode`]
//!   (local, remote or autonomous) with a `alive -> dying -> hidden -> alive`
//!   life cycle driven by the simulation clock.
//! - **Registry** ([`registry`]): insertion-ordered store with unique
//!   identities and a score-ranked view.
//! - **Reconciliation** ([`reconcile`]): applies server events to the
//!   registry, lazily materializing entities it has not seen yet.
//! - **Session** ([`session`]): pointer/click input, the outbound path and
//!   offline single-player mode.
//! - **Simulation** ([`simulation`]): the frame loop that steers, ticks,
//!   animates effects and redraws through the [`Canvas`] and [`Presenter`]
//!   seams.
//!
//! The core does no I/O of its own. The host supplies a [`Transport`] for
//! outbound messages, feeds inbound text to [`Session::handle_message`], and
//! calls [`Simulation::frame`] once per animation frame.
//!
//! ## Usage
//!
//! ```
//! use swatfly_core::{Appearance, GameConfig, NullPresenter, Session, Simulation};
//! use swatfly_core::link::Disconnected;
//!
//! let config = GameConfig::default().with_seed(42);
//! let mut session = Session::new(config, Appearance::named("Ann", "🐝"), Disconnected)?;
//! session.start_offline();
//!
//! let sim = Simulation::new(session, NullPresenter);
//! assert_eq!(sim.session().world().registry.len(), 6);
//! # Ok::<(), swatfly_core::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Core modules
pub mod entity;
pub mod registry;
pub mod world;

// Network edge
pub mod link;
pub mod protocol;
pub mod reconcile;

// Frame loop and presentation
pub mod effects;
pub mod movement;
pub mod notice;
pub mod render;
pub mod session;
pub mod simulation;

// Ambient
pub mod config;
pub mod error;

#[cfg(test)]
mod tests;

pub use config::GameConfig;
pub use entity::{Appearance, AppearancePatch, ControlMode, Entity, EntityId, LifeState};
pub use error::{ConfigError, ProtocolError};
pub use link::{Outbound, Reconnector, Transport};
pub use reconcile::{Applied, InboundEvent, Reconciler};
pub use registry::Registry;
pub use render::{Canvas, NullPresenter, Presenter, Sprite};
pub use session::{ClickOutcome, Mode, Session};
pub use simulation::{FrameStatus, Simulation};
pub use world::World;
