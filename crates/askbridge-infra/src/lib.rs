//! Concrete collaborators for askbridge.
//!
//! Implements the capability traits from `askbridge-core`: TOML-backed
//! configuration storage, the Gemini and OpenAI answer providers, provider
//! resolution, the first-install marker, and the options-surface navigator.

pub mod install;
pub mod navigate;
pub mod provider;
pub mod store;
