use std::{collections::BTreeMap, fmt, time::SystemTime};

use uuid::Uuid;

/// Unique identifier of a [`Message`](crate::Message).
///
/// Random (UUID v4), so it says nothing about arrival order; use
/// [`Received::seq`](crate::Received::seq) for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MessageId(Uuid);

impl MessageId {
    pub(crate) fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Metadata attached to every [`Message`](crate::Message).
///
/// - `id`: unique message identifier.
/// - `timestamp`: creation time in nanoseconds since the Unix epoch.
/// - `headers`: free-form string headers set by the producing source.
///
/// Metadata is never part of a comparison; only the body is.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meta {
    id: MessageId,
    timestamp: u64,
    headers: BTreeMap<String, String>,
}

impl Meta {
    pub fn new() -> Self {
        Self {
            id: MessageId::random(),
            // A clock set before the epoch yields 0 rather than failing.
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
            headers: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Nanoseconds since the Unix epoch, truncated to `u64`.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub(crate) fn set_header(&mut self, name: String, value: String) {
        self.headers.insert(name, value);
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message {} at {}ns", self.id, self.timestamp)?;
        for (name, value) in &self.headers {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}
