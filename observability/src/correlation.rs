//! Per-run correlation ids, attached to every `tracing` span for a CLI
//! invocation so log lines from enrichment, building, and storage for the
//! same run can be joined after the fact.

use uuid::Uuid;

/// Opaque identifier for one pipeline run (one CLI invocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
