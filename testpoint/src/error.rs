use std::{sync::Arc, time::Duration};

use crate::Mismatch;

/// The single error type for all testpoint operations.
///
/// Every fallible API returns `testpoint::Result<T>` (alias for
/// `Result<T, testpoint::Error>`). Startup failures (`SourceUnavailable`,
/// `PayloadExtraction`) abort the endpoint start; `ExpectationMismatch` is the
/// ordinary way a failed verification is reported and never comes out of the
/// accept path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("expected message source '{name}' is unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("failed to extract payload #{index} from source '{source_name}': {reason}")]
    PayloadExtraction {
        source_name: String,
        index: usize,
        reason: String,
    },

    #[error("expectations have already been loaded or are loading")]
    AlreadyInitialized,

    #[error("sink is not ready: expectations have not been installed")]
    NotReady,

    #[error("endpoint has not been initialized")]
    NotInitialized,

    #[error("source '{0}' is already registered")]
    DuplicateSource(String),

    #[error("received messages do not match expectations: {0}")]
    ExpectationMismatch(Mismatch),

    #[error("settle condition not met within {0:?}: {1} messages received")]
    SettleTimeout(Duration, usize),

    #[error("IO error: {0}")]
    IoError(#[source] Arc<std::io::Error>),
}

impl Error {
    pub(crate) fn unavailable(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the mismatch details when this is a verification failure.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Error::ExpectationMismatch(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::SourceUnavailable { name: a, reason: r1 },
                Self::SourceUnavailable { name: b, reason: r2 },
            ) => a == b && r1 == r2,
            (
                Self::PayloadExtraction {
                    source_name: s1,
                    index: i1,
                    reason: r1,
                },
                Self::PayloadExtraction {
                    source_name: s2,
                    index: i2,
                    reason: r2,
                },
            ) => s1 == s2 && i1 == i2 && r1 == r2,
            (Self::AlreadyInitialized, Self::AlreadyInitialized) => true,
            (Self::NotReady, Self::NotReady) => true,
            (Self::NotInitialized, Self::NotInitialized) => true,
            (Self::DuplicateSource(a), Self::DuplicateSource(b)) => a == b,
            (Self::ExpectationMismatch(a), Self::ExpectationMismatch(b)) => a == b,
            (Self::SettleTimeout(a1, a2), Self::SettleTimeout(b1, b2)) => a1 == b1 && a2 == b2,
            (Self::IoError(a), Self::IoError(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(Arc::new(e))
    }
}

/// Failure to turn a message body into a comparable [`Payload`](crate::Payload).
///
/// Returned by [`Extract`](crate::Extract) implementations. The loader wraps it
/// into [`Error::PayloadExtraction`] together with the source name and the
/// position of the offending message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ExtractError(String);

impl ExtractError {
    pub fn new(reason: impl ToString) -> Self {
        Self(reason.to_string())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}
