//! Capability traits and the connection relay for askbridge.
//!
//! This crate defines the seams between the relay and its collaborators
//! (providers, configuration storage, the options surface) as traits, and
//! implements the per-channel relay state machine on top of them. Concrete
//! implementations live in `askbridge-infra`.

pub mod navigate;
pub mod provider;
pub mod relay;
pub mod store;
