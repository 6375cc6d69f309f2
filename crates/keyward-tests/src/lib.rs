//! Integration test infrastructure for Keyward.
//!
//! Provides provider doubles, a log capture writer, and resolver helpers
//! shared by the tests under `tests/`.

pub mod capture;
pub mod fixtures;
pub mod helpers;
