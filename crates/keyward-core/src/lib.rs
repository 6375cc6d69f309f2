//! Keyward Core
//!
//! Core secret types, telemetry events, and error handling for Keyward.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the resolver, its providers, and its consumers.

pub mod error;
pub mod events;
pub mod secrets;

pub use error::{Error, Result};
pub use events::ResolutionEvent;
pub use secrets::{KeyHash, SecretKey, SecretResult, SecretSource, SecretString};
