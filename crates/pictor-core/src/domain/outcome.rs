//! Outcome model: the result of one successful generation.
//!
//! A generation is successful as soon as the payload has been downloaded.
//! Later best-effort steps (persisting the payload, committing the rate-limit
//! slot) never turn it into a failure; their problems travel alongside the
//! result as `Warning`s so callers and tests can see them.

use serde::Serialize;

use super::artifact::ArtifactRecord;
use super::request::Cost;

/// A problem in a best-effort step after the payload was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    /// The payload could not be persisted; it is only available in this outcome.
    StorageFailed(String),

    /// The rate-limit slot could not be written back.
    LimiterPersistFailed(String),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::StorageFailed(reason) => write!(f, "image was not saved: {reason}"),
            Warning::LimiterPersistFailed(reason) => {
                write!(f, "rate limit state was not updated: {reason}")
            }
        }
    }
}

/// Result of `GenerationOrchestrator::generate`.
///
/// - `record` is `None` when persistence failed (degraded success).
/// - `estimated_cost` is the fixed price for the requested size/quality tier.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub payload: Vec<u8>,
    pub record: Option<ArtifactRecord>,
    pub estimated_cost: Cost,
    pub warnings: Vec<Warning>,
}

impl GenerationOutcome {
    /// Persisted and committed with nothing to report.
    pub fn is_clean(&self) -> bool {
        self.record.is_some() && self.warnings.is_empty()
    }

    /// The payload was returned but not persisted.
    pub fn is_degraded(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::StorageFailed(_)))
    }
}
