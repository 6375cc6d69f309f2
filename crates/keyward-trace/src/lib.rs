//! Tracing integration for Keyward.
//!
//! Installs the process-wide `tracing` subscriber and provides span
//! constructors that only ever carry hashed key names.

pub mod spans;
pub mod tracer;

pub use spans::{cache_span, provider_span, resolve_span};
pub use tracer::{LogFormat, TracerError, TracingConfig, init_tracing};
