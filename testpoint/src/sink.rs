use std::{
    fmt,
    marker::PhantomData,
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
    time::Duration,
};

use crate::{
    Error, ExpectationSequence, Extract, Identity, Message, Mismatch, Payload, Received, Result,
    SinkState, sequence::ReceivedSequence, settle::Settle,
};

/// Records live messages and compares them to installed expectations.
///
/// The sink is shared between the delivery side, which calls
/// [`accept`](Self::accept) from any number of tasks, and the test side, which
/// calls [`verify`](Self::verify) once its own synchronisation point has been
/// reached (or uses [`verify_within`](Self::verify_within) to wait for the
/// expected number of messages).
///
/// Payloads are extracted with the same [`Extract`] implementation used to
/// load the expectations, [`Identity`] by default.
///
/// # Example
///
/// ```rust
/// use testpoint::{ComparisonSink, Error, ExpectationSequence, Message};
///
/// let sink = ComparisonSink::<&str>::new("greetings");
/// assert_eq!(sink.accept(Message::new("too early")), Err(Error::NotReady));
///
/// sink.install(ExpectationSequence::new(["hello", "world"]))?;
/// sink.accept(Message::new("hello"))?;
/// sink.accept(Message::new("world"))?;
/// sink.verify()?;
/// # Ok::<(), testpoint::Error>(())
/// ```
pub struct ComparisonSink<B, X = Identity> {
    name: String,
    extractor: X,
    expected: OnceLock<ExpectationSequence>,
    received: ReceivedSequence,
    state: Mutex<SinkState>,
    _body: PhantomData<fn(Message<B>)>,
}

impl<B> ComparisonSink<B, Identity>
where
    Identity: Extract<B>,
{
    /// Create a sink comparing bodies as they are.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_extractor(name, Identity)
    }
}

impl<B, X: Extract<B>> ComparisonSink<B, X> {
    /// Create a sink that compares bodies after running them through `extractor`.
    pub fn with_extractor(name: impl Into<String>, extractor: X) -> Self {
        Self {
            name: name.into(),
            extractor,
            expected: OnceLock::new(),
            received: ReceivedSequence::default(),
            state: Mutex::new(SinkState::Uninitialized),
            _body: PhantomData,
        }
    }

    /// Move to [`SinkState::Loading`] while the expectations are drained.
    /// A sink gets one load attempt; a failed one is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] unless the sink is
    /// [`SinkState::Uninitialized`].
    pub(crate) fn begin_loading(&self) -> Result<()> {
        let mut state = self.lock_state();
        match *state {
            SinkState::Uninitialized => {
                *state = SinkState::Loading;
                Ok(())
            }
            _ => Err(Error::AlreadyInitialized),
        }
    }

    /// Install the expectations. Must happen exactly once, before any live
    /// message is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] on a second call.
    pub fn install(&self, expected: ExpectationSequence) -> Result<()> {
        let mut state = self.lock_state();
        let count = expected.len();
        self.expected
            .set(expected)
            .map_err(|_| Error::AlreadyInitialized)?;
        *state = SinkState::Ready;
        tracing::debug!(sink = %self.name, count, "expectations installed");
        Ok(())
    }

    /// Record a live message and return its sequence number.
    ///
    /// Never fails once the sink is ready: a body that cannot be extracted is
    /// recorded as such and reported by [`verify`](Self::verify).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] before expectations are installed.
    pub fn accept(&self, message: impl Into<Message<B>>) -> Result<u64> {
        if self.expected.get().is_none() {
            return Err(Error::NotReady);
        }
        let message = message.into();
        let payload = self.extractor.extract(&message);
        if let Err(e) = &payload {
            tracing::warn!(sink = %self.name, message_id = %message.id(), error = %e, "received unextractable message");
        }
        let seq = self.received.append(message.id(), payload);
        tracing::trace!(sink = %self.name, seq, message_id = %message.id(), "message accepted");
        Ok(seq)
    }

    /// Compare the received messages with the expectations.
    ///
    /// Succeeds only if both sequences have the same length and every pair is
    /// equal, in order. Calling it again without new messages gives the same
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpectationMismatch`] describing the first divergence,
    /// or [`Error::NotReady`] before expectations are installed.
    pub fn verify(&self) -> Result<()> {
        let expected = self.expected.get().ok_or(Error::NotReady)?;
        let received = self.received.snapshot();
        let outcome = Mismatch::find(expected, &received);

        let mut state = self.lock_state();
        match outcome {
            None => {
                *state = SinkState::Verified;
                tracing::debug!(sink = %self.name, count = received.len(), "expectations satisfied");
                Ok(())
            }
            Some(mismatch) => {
                *state = SinkState::Failed;
                tracing::warn!(sink = %self.name, %mismatch, "expectations not satisfied");
                Err(Error::ExpectationMismatch(mismatch))
            }
        }
    }

    /// Wait until as many messages as expected have arrived, then
    /// [`verify`](Self::verify).
    ///
    /// If `timeout` elapses first, verification runs anyway and reports the
    /// missing messages.
    pub async fn verify_within(&self, timeout: Duration) -> Result<()> {
        let count = self.expected.get().ok_or(Error::NotReady)?.len();
        match self.settle_on(count).within(timeout).await {
            Ok(()) | Err(Error::SettleTimeout(..)) => self.verify(),
            Err(e) => Err(e),
        }
    }

    /// Return a builder future that resolves once at least `count` messages
    /// have been accepted.
    ///
    /// Defaults to a 1-second timeout, overridable with
    /// [`within`](Settle::within); on expiry it fails with
    /// [`Error::SettleTimeout`].
    ///
    /// ```rust,ignore
    /// sink.settle_on(3).within(Duration::from_millis(500)).await?;
    /// ```
    pub fn settle_on(&self, count: usize) -> Settle<'_, B, X> {
        Settle::new(self, count)
    }

    /// Forget every received message, keeping the expectations.
    pub fn reset(&self) {
        self.received.clear();
        let mut state = self.lock_state();
        if state.is_ready() {
            *state = SinkState::Ready;
        }
    }

    pub fn state(&self) -> SinkState {
        *self.lock_state()
    }

    /// The installed expectations, if any.
    pub fn expected(&self) -> Option<&ExpectationSequence> {
        self.expected.get()
    }

    /// Snapshot of everything received so far, in order.
    pub fn received(&self) -> Vec<Received> {
        self.received.snapshot()
    }

    /// Snapshot of the extracted payloads received so far, skipping
    /// unextractable messages.
    pub fn received_payloads(&self) -> Vec<Payload> {
        self.received
            .snapshot()
            .into_iter()
            .filter_map(|r| r.payload().cloned())
            .collect()
    }

    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }

    pub(crate) fn received_sequence(&self) -> &ReceivedSequence {
        &self.received
    }

    fn lock_state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B, X> ComparisonSink<B, X> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<B, X> fmt::Debug for ComparisonSink<B, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparisonSink")
            .field("name", &self.name)
            .field("state", &*self.state.lock().unwrap_or_else(PoisonError::into_inner))
            .field("expected", &self.expected.get().map(|e| e.len()))
            .field("received", &self.received.len())
            .finish_non_exhaustive()
    }
}
