//! relay-core: framework-agnostic ambient layer for the stream relay.
//!
//! Holds the pieces every other crate leans on without caring about
//! HTTP or the remote store: a string key/value configuration store and
//! the structured error type that transports turn into responses.

pub mod config;
pub mod errors;

pub use config::{ConfigSnapshot, ConfigStore};
pub use errors::{ApiError, ErrorKind};
