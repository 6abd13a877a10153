use std::{fmt, hash};

/// Lifecycle state of a [`ComparisonSink`](crate::ComparisonSink).
///
/// ```text
/// Uninitialized -> Loading -> Ready -> Verified | Failed
/// ```
///
/// The sink accepts live messages from `Ready` onwards. `Verified` and
/// `Failed` record the outcome of the latest [`verify`](crate::ComparisonSink::verify)
/// call; a later call (or [`reset`](crate::ComparisonSink::reset)) may move
/// between them and `Ready`, but never back to `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, hash::Hash, Default)]
pub enum SinkState {
    /// No expectations yet. This is the initial state.
    #[default]
    Uninitialized,
    /// The expectation source is being drained.
    Loading,
    /// Expectations are installed; live messages are accepted.
    Ready,
    /// The latest verification succeeded.
    Verified,
    /// The latest verification found a mismatch.
    Failed,
}

impl SinkState {
    /// Returns `true` once expectations are installed.
    pub fn is_ready(&self) -> bool {
        matches!(self, SinkState::Ready | SinkState::Verified | SinkState::Failed)
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkState::Uninitialized => write!(f, "Uninitialized"),
            SinkState::Loading => write!(f, "Loading"),
            SinkState::Ready => write!(f, "Ready"),
            SinkState::Verified => write!(f, "Verified"),
            SinkState::Failed => write!(f, "Failed"),
        }
    }
}
