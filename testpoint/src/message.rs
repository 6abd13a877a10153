use std::fmt;

use crate::{MessageId, Meta};

/// A message flowing from a source or into a sink.
///
/// Pairs a body of caller-chosen type `B` with [`Meta`] (id, timestamp,
/// headers). The body is turned into a [`Payload`](crate::Payload) by an
/// [`Extract`](crate::Extract) implementation before comparison; headers are
/// informational only.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message<B> {
    meta: Meta,
    body: B,
}

impl<B> Message<B> {
    pub fn new(body: B) -> Self {
        Self {
            meta: Meta::new(),
            body,
        }
    }

    /// Attach a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.set_header(name.into(), value.into());
        self
    }

    /// Returns a reference to the message body.
    #[inline]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Consumes the message and returns its body.
    pub fn into_body(self) -> B {
        self.body
    }

    /// Returns the message metadata (id, timestamp, headers).
    #[inline]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Shorthand for `self.meta().id()`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.meta.id()
    }

    /// Shorthand for `self.meta().header(name)`.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta.header(name)
    }
}

impl<B> From<B> for Message<B> {
    fn from(body: B) -> Self {
        Message::new(body)
    }
}

impl<B: PartialEq> PartialEq for Message<B> {
    fn eq(&self, other: &Self) -> bool {
        self.meta.id() == other.meta.id() && self.body == other.body
    }
}

impl<B: fmt::Debug> fmt::Debug for Message<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.meta.id())
            .field("body", &self.body)
            .field("headers", self.meta.headers())
            .field("timestamp", &self.meta.timestamp())
            .finish()
    }
}
