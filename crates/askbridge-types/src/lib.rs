//! Shared domain types for askbridge.
//!
//! This crate has no I/O and no async code. It defines the data shapes
//! that cross crate boundaries: provider tags, channel message shapes,
//! provider configuration, and the error taxonomy.

pub mod channel;
pub mod config;
pub mod error;
pub mod provider;
