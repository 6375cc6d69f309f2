//! Resolution telemetry hook.

use keyward_core::{KeyHash, ResolutionEvent, SecretSource};
use std::sync::Mutex;
use tracing::{info, warn};

/// Observer for resolution outcomes. Receives key hashes only.
pub trait MetricsSink: Send + Sync {
    fn on_resolve(&self, key_hash: &KeyHash, source: SecretSource, depth: usize, elapsed_ms: f64);

    fn on_miss(&self, key_hash: &KeyHash);

    /// A provider failed or timed out; `kind` is an error label, not a message.
    fn on_provider_error(&self, _key_hash: &KeyHash, _provider: &str, _kind: &str) {}

    /// A cached entry failed authentication and was discarded.
    fn on_integrity_failure(&self, _key_hash: &KeyHash) {}
}

/// Writes every event as JSON on the `keyward::metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    fn emit(&self, event: ResolutionEvent) {
        match event.to_json() {
            Ok(json) => info!(target: "keyward::metrics", event = %json),
            Err(e) => warn!(target: "keyward::metrics", error = %e, "Failed to encode metrics event"),
        }
    }
}

impl MetricsSink for TracingSink {
    fn on_resolve(&self, key_hash: &KeyHash, source: SecretSource, depth: usize, elapsed_ms: f64) {
        self.emit(ResolutionEvent::Resolve {
            key_hash: key_hash.clone(),
            source,
            depth,
            elapsed_ms,
        });
    }

    fn on_miss(&self, key_hash: &KeyHash) {
        self.emit(ResolutionEvent::Miss {
            key_hash: key_hash.clone(),
        });
    }

    fn on_provider_error(&self, key_hash: &KeyHash, provider: &str, kind: &str) {
        self.emit(ResolutionEvent::ProviderError {
            key_hash: key_hash.clone(),
            provider: provider.to_string(),
            kind: kind.to_string(),
        });
    }

    fn on_integrity_failure(&self, key_hash: &KeyHash) {
        self.emit(ResolutionEvent::IntegrityFailure {
            key_hash: key_hash.clone(),
        });
    }
}

/// Buffers events in memory so callers can forward them in batches.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ResolutionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<ResolutionEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResolutionEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, event: ResolutionEvent) {
        self.lock().push(event);
    }
}

impl MetricsSink for RecordingSink {
    fn on_resolve(&self, key_hash: &KeyHash, source: SecretSource, depth: usize, elapsed_ms: f64) {
        self.push(ResolutionEvent::Resolve {
            key_hash: key_hash.clone(),
            source,
            depth,
            elapsed_ms,
        });
    }

    fn on_miss(&self, key_hash: &KeyHash) {
        self.push(ResolutionEvent::Miss {
            key_hash: key_hash.clone(),
        });
    }

    fn on_provider_error(&self, key_hash: &KeyHash, provider: &str, kind: &str) {
        self.push(ResolutionEvent::ProviderError {
            key_hash: key_hash.clone(),
            provider: provider.to_string(),
            kind: kind.to_string(),
        });
    }

    fn on_integrity_failure(&self, key_hash: &KeyHash) {
        self.push(ResolutionEvent::IntegrityFailure {
            key_hash: key_hash.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::SecretKey;

    #[test]
    fn test_recording_sink_collects_and_drains() {
        let sink = RecordingSink::new();
        let hash = SecretKey::new("X").hash();

        sink.on_resolve(&hash, SecretSource::Platform, 2, 0.4);
        sink.on_miss(&hash);
        sink.on_provider_error(&hash, "vault", "timeout");

        let events = sink.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ResolutionEvent::Resolve { depth: 2, .. }));
        assert!(matches!(events[1], ResolutionEvent::Miss { .. }));
        assert!(sink.events().is_empty());
    }
}
