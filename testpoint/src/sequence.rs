use std::{
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;

use crate::{ExtractError, MessageId, Payload};

/// The ordered payloads a sink expects to receive.
///
/// Built once by the [`ExpectationLoader`](crate::ExpectationLoader) and never
/// mutated afterwards. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpectationSequence(Arc<[Payload]>);

impl ExpectationSequence {
    pub fn new(payloads: impl IntoIterator<Item = impl Into<Payload>>) -> Self {
        Self(payloads.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[Payload] {
        &self.0
    }
}

impl Deref for ExpectationSequence {
    type Target = [Payload];

    fn deref(&self) -> &[Payload] {
        &self.0
    }
}

impl From<Vec<Payload>> for ExpectationSequence {
    fn from(value: Vec<Payload>) -> Self {
        Self(value.into())
    }
}

/// A message recorded by a sink.
///
/// - `seq`: position in the sink's total order (assigned on append)
/// - `id`: the id of the accepted message
/// - `payload`: the extracted payload, or why extraction failed
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    seq: u64,
    id: MessageId,
    payload: Result<Payload, ExtractError>,
}

impl Received {
    pub(crate) fn new(seq: u64, id: MessageId, payload: Result<Payload, ExtractError>) -> Self {
        Self { seq, id, payload }
    }

    /// Sequence number in arrival order, starting at 0.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The extracted payload, or `None` if extraction failed.
    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref().ok()
    }

    /// The extraction failure, if any.
    #[inline]
    pub fn error(&self) -> Option<&ExtractError> {
        self.payload.as_ref().err()
    }
}

/// Append-only record of what a sink has accepted.
///
/// Appends may come from many tasks or threads at once. Each append takes the
/// lock, receives the next sequence number, and pushes, so the stored order is
/// exactly the lock acquisition order and `seq` is strictly increasing along
/// it. Waiters registered through [`notify`](Self::notify) are woken on
/// every append.
#[derive(Debug, Default)]
pub(crate) struct ReceivedSequence {
    inner: Mutex<ReceivedInner>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct ReceivedInner {
    entries: Vec<Received>,
    next_seq: u64,
}

impl ReceivedSequence {
    pub(crate) fn append(&self, id: MessageId, payload: Result<Payload, ExtractError>) -> u64 {
        let seq = {
            let mut inner = self.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.entries.push(Received::new(seq, id, payload));
            seq
        };
        self.notify.notify_waiters();
        seq
    }

    pub(crate) fn snapshot(&self) -> Vec<Received> {
        self.lock().entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Drop all entries. Sequence numbers keep increasing across clears.
    pub(crate) fn clear(&self) {
        self.lock().entries.clear();
        self.notify.notify_waiters();
    }

    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }

    fn lock(&self) -> MutexGuard<'_, ReceivedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn expectation_sequence_from_values() {
        let seq = ExpectationSequence::new(["a", "b"]);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0], Payload::from("a"));
        assert_eq!(seq.as_slice()[1], Payload::from("b"));
    }

    #[test]
    fn appends_get_increasing_sequence_numbers() {
        let received = ReceivedSequence::default();
        assert_eq!(received.append(MessageId::random(), Ok(Payload::from(1))), 0);
        assert_eq!(received.append(MessageId::random(), Ok(Payload::from(2))), 1);

        let snapshot = received.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].payload(), Some(&Payload::Int(2)));
    }

    #[test]
    fn clear_keeps_counting() {
        let received = ReceivedSequence::default();
        received.append(MessageId::random(), Ok(Payload::Null));
        received.clear();
        assert_eq!(received.len(), 0);
        assert_eq!(received.append(MessageId::random(), Ok(Payload::Null)), 1);
    }

    #[test]
    fn failed_extraction_is_recorded() {
        let received = ReceivedSequence::default();
        received.append(MessageId::random(), Err(ExtractError::new("bad body")));
        let entry = &received.snapshot()[0];
        assert_eq!(entry.payload(), None);
        assert_eq!(entry.error().map(ExtractError::reason), Some("bad body"));
    }

    #[test]
    fn concurrent_appends_form_a_total_order() {
        let received = Arc::new(ReceivedSequence::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let received = received.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        received.append(MessageId::random(), Ok(Payload::from(t * 1000 + i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = received.snapshot();
        assert_eq!(snapshot.len(), 800);
        for (i, entry) in snapshot.iter().enumerate() {
            assert_eq!(entry.seq(), i as u64);
        }
        // Each producer's own messages keep their relative order.
        for t in 0..8 {
            let own: Vec<_> = snapshot
                .iter()
                .filter_map(|e| match e.payload() {
                    Some(Payload::Int(v)) if v / 1000 == t => Some(*v),
                    _ => None,
                })
                .collect();
            assert_eq!(own, (0..100).map(|i| t * 1000 + i).collect::<Vec<_>>());
        }
    }
}
