use std::fmt;

use crate::{Payload, Received};

/// How the received sequence diverged from the expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchKind {
    /// Both sides have an element at the index, but they differ.
    Different,
    /// Fewer messages were received than expected.
    Missing,
    /// More messages were received than expected.
    Extra,
    /// The received message's payload could not be extracted.
    Unextractable,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchKind::Different => write!(f, "different"),
            MismatchKind::Missing => write!(f, "missing"),
            MismatchKind::Extra => write!(f, "extra"),
            MismatchKind::Unextractable => write!(f, "unextractable"),
        }
    }
}

/// The first point where received messages diverge from the expectations.
///
/// `expected` is `None` for [`MismatchKind::Extra`]; `actual` is `None` for
/// [`MismatchKind::Missing`] and [`MismatchKind::Unextractable`] (the reason
/// is in `detail`).
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    index: usize,
    kind: MismatchKind,
    expected: Option<Payload>,
    actual: Option<Payload>,
    detail: Option<String>,
    expected_len: usize,
    received_len: usize,
}

impl Mismatch {
    /// Compare element-wise, in order, and report the first divergence.
    ///
    /// Returns `None` when both sequences have the same length and every pair
    /// is equal.
    pub(crate) fn find(expected: &[Payload], received: &[Received]) -> Option<Self> {
        let expected_len = expected.len();
        let received_len = received.len();
        let mismatch = |index, kind, expected: Option<&Payload>, actual: Option<&Payload>| Mismatch {
            index,
            kind,
            expected: expected.cloned(),
            actual: actual.cloned(),
            detail: None,
            expected_len,
            received_len,
        };

        for index in 0..expected_len.max(received_len) {
            match (expected.get(index), received.get(index)) {
                (Some(want), Some(got)) => match got.payload() {
                    Some(actual) if actual == want => continue,
                    Some(actual) => {
                        return Some(mismatch(index, MismatchKind::Different, Some(want), Some(actual)));
                    }
                    None => {
                        let mut m = mismatch(index, MismatchKind::Unextractable, Some(want), None);
                        m.detail = got.error().map(|e| e.reason().to_owned());
                        return Some(m);
                    }
                },
                (Some(want), None) => {
                    return Some(mismatch(index, MismatchKind::Missing, Some(want), None));
                }
                (None, Some(got)) => {
                    let mut m = mismatch(index, MismatchKind::Extra, None, got.payload());
                    m.detail = got.error().map(|e| e.reason().to_owned());
                    return Some(m);
                }
                (None, None) => unreachable!("index is below the longer length"),
            }
        }
        None
    }

    /// Index of the first divergence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> MismatchKind {
        self.kind
    }

    pub fn expected(&self) -> Option<&Payload> {
        self.expected.as_ref()
    }

    pub fn actual(&self) -> Option<&Payload> {
        self.actual.as_ref()
    }

    /// Extraction failure reason for unextractable messages.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    pub fn received_len(&self) -> usize {
        self.received_len
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at index {}: ", self.index)?;
        match self.kind {
            MismatchKind::Different | MismatchKind::Missing => {
                if let Some(expected) = &self.expected {
                    write!(f, "expected {expected}, ")?;
                }
                match &self.actual {
                    Some(actual) => write!(f, "actual {actual}")?,
                    None => write!(f, "actual missing")?,
                }
            }
            MismatchKind::Extra => match &self.actual {
                Some(actual) => write!(f, "extra {actual}")?,
                None => write!(f, "extra unextractable message")?,
            },
            MismatchKind::Unextractable => {
                if let Some(expected) = &self.expected {
                    write!(f, "expected {expected}, ")?;
                }
                write!(f, "actual unextractable")?;
                if let Some(detail) = &self.detail {
                    write!(f, " ({detail})")?;
                }
            }
        }
        write!(
            f,
            " [expected {} messages, received {}]",
            self.expected_len, self.received_len
        )
    }
}
