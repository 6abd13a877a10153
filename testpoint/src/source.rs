use std::{fmt, pin::Pin, time::Duration};

use futures_util::Stream;

use crate::{Message, Result};

/// A lazy, one-shot stream of messages produced by an [`ExpectedSource`].
///
/// The stream ends when the source is exhausted. It is polled by the
/// [`ExpectationLoader`](crate::ExpectationLoader), which also enforces the
/// load timeout, so sources that never end are fine.
pub type Subscription<B> = Pin<Box<dyn Stream<Item = Message<B>> + Send>>;

/// A producer of the messages whose bodies become the expectations.
///
/// Sources are registered by name in a [`SourceRegistry`](crate::SourceRegistry)
/// and resolved when a [`TestEndpoint`](crate::TestEndpoint) is constructed.
/// Opening a source yields a [`Subscription`]; whether a source can be opened
/// more than once is up to the implementation.
///
/// See [`crate::sources`] for the built-in implementations.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use futures_util::stream;
/// use testpoint::{ExpectedSource, Message, Result, Subscription};
///
/// struct Greetings;
///
/// impl ExpectedSource<&'static str> for Greetings {
///     fn name(&self) -> &str {
///         "greetings"
///     }
///
///     fn open(&self, _timeout: Duration) -> Result<Subscription<&'static str>> {
///         let messages = ["hello", "world"].map(Message::new);
///         Ok(Box::pin(stream::iter(messages)))
///     }
/// }
/// ```
pub trait ExpectedSource<B>: Send + Sync {
    /// Name used for diagnostics; usually the name it is registered under.
    fn name(&self) -> &str;

    /// Open a polling subscription.
    ///
    /// `timeout` is the load-phase budget; sources may use it as a hint (for
    /// instance to bound their own I/O) but the loader enforces it regardless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`](crate::Error::SourceUnavailable)
    /// when the source cannot be reached or has already been consumed.
    fn open(&self, timeout: Duration) -> Result<Subscription<B>>;
}

impl<B> fmt::Debug for dyn ExpectedSource<B> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedSource")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
