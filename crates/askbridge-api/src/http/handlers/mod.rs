//! Request handlers.

pub mod control;
pub mod ws;
