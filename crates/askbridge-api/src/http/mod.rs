//! HTTP surface: router and request handlers.

pub mod handlers;
pub mod router;
