use thiserror::Error;

use crate::sim::SnapshotError;

use super::context::PhaseId;
use super::services::ContentKind;

/// A content or frame fetch that did not produce a usable asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {kind} content: {reason}")]
pub struct LoadFailure {
    pub kind: ContentKind,
    pub reason: String,
}

impl LoadFailure {
    pub fn new(kind: ContentKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MissionError {
    #[error(transparent)]
    LoadFailure(#[from] LoadFailure),
    #[error("phase {phase} produced no completion after {elapsed_seconds:.1}s")]
    PhaseStuck { phase: PhaseId, elapsed_seconds: f32 },
    #[error("snapshot could not be applied: {reason}")]
    SnapshotMismatch { reason: String },
    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },
    #[error("phase {phase} still owns {count} live timers")]
    TimerLeak { phase: PhaseId, count: usize },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl MissionError {
    pub(crate) fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            reason: reason.into(),
        }
    }
}
