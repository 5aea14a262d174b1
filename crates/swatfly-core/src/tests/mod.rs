//! Test module for scenario and property tests.
//!
//! - `scenarios.rs`: end-to-end flows through session, reconciler and
//!   simulation, online and offline
//! - `properties.rs`: `proptest` checks of the entity and registry
//!   invariants
//! - `helpers.rs`: recording collaborators and factory functions

mod helpers;

pub use helpers::*;
