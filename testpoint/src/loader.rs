use std::{fmt, time::Duration};

use futures_util::StreamExt;
use tokio::time::{Instant, timeout_at};

use crate::{Error, ExpectationSequence, Extract, Result, Subscription};

/// Drains a [`Subscription`] into an [`ExpectationSequence`].
///
/// The timeout is a single deadline measured from the start of the load, not
/// an idle timeout between messages: a source that keeps trickling messages
/// cannot hold the start up for longer than the configured budget. This
/// differs from waiting up to `timeout` for each receive, which would let a
/// steady trickle delay startup indefinitely. When the deadline passes, the
/// messages collected so far are returned as-is.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> testpoint::Result {
/// use std::time::Duration;
/// use testpoint::{ExpectationLoader, ExpectedSource, Identity, Payload, sources::VecSource};
///
/// let source = VecSource::new("greetings", vec!["hello", "world"]);
/// let timeout = Duration::from_millis(100);
/// let loader = ExpectationLoader::new(source.name(), timeout);
/// let expected = loader.load(source.open(timeout)?, &Identity).await?;
///
/// assert_eq!(expected.as_slice(), &[Payload::from("hello"), Payload::from("world")]);
/// # Ok(())
/// # }
/// ```
pub struct ExpectationLoader {
    source_name: String,
    timeout: Duration,
}

impl ExpectationLoader {
    pub fn new(source_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            source_name: source_name.into(),
            timeout,
        }
    }

    /// Collect payloads in arrival order until the stream ends or the
    /// deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadExtraction`] as soon as one message cannot be
    /// extracted; the partial sequence is discarded, since a missing expected
    /// element would shift every later comparison.
    pub async fn load<B, X>(&self, mut subscription: Subscription<B>, extractor: &X) -> Result<ExpectationSequence>
    where
        X: Extract<B> + ?Sized,
    {
        tracing::debug!(source = %self.source_name, timeout = ?self.timeout, "consuming expected messages");

        // A timeout too large to represent means no deadline at all.
        let deadline = Instant::now().checked_add(self.timeout);
        let mut payloads = Vec::new();

        loop {
            let next = match deadline {
                Some(deadline) => timeout_at(deadline, subscription.next()).await,
                None => Ok(subscription.next().await),
            };
            match next {
                Ok(Some(message)) => {
                    let index = payloads.len();
                    let payload = extractor.extract(&message).map_err(|e| Error::PayloadExtraction {
                        source_name: self.source_name.clone(),
                        index,
                        reason: e.to_string(),
                    })?;
                    tracing::trace!(source = %self.source_name, index, body = %payload, "received expected body");
                    payloads.push(payload);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(
                        source = %self.source_name,
                        count = payloads.len(),
                        "timed out waiting for expected messages, keeping what arrived"
                    );
                    break;
                }
            }
        }

        tracing::debug!(source = %self.source_name, count = payloads.len(), "received expected messages");
        Ok(ExpectationSequence::from(payloads))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ExpectationLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectationLoader")
            .field("source", &self.source_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;
    use crate::{ExpectedSource, ExtractError, Identity, Message, Payload, sources::ChannelSource};

    fn subscription<B: Send + 'static>(bodies: Vec<B>) -> Subscription<B> {
        Box::pin(stream::iter(bodies.into_iter().map(Message::new)))
    }

    #[tokio::test]
    async fn collects_bodies_in_order() {
        let loader = ExpectationLoader::new("src", Duration::from_secs(1));
        let expected = loader
            .load(subscription(vec!["a", "b", "c"]), &Identity)
            .await
            .unwrap();
        assert_eq!(expected, ExpectationSequence::new(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn empty_source_yields_empty_sequence() {
        let loader = ExpectationLoader::new("src", Duration::from_secs(1));
        let expected = loader
            .load(subscription(Vec::<i32>::new()), &Identity)
            .await
            .unwrap();
        assert!(expected.is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_aborts_load() {
        let loader = ExpectationLoader::new("numbers", Duration::from_secs(1));
        let only_even = |m: &Message<i32>| -> std::result::Result<Payload, ExtractError> {
            if m.body() % 2 == 0 {
                Ok(Payload::from(*m.body()))
            } else {
                Err(ExtractError::new("odd body"))
            }
        };

        let err = loader
            .load(subscription(vec![2, 4, 5, 6]), &only_even)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::PayloadExtraction {
                source_name: "numbers".into(),
                index: 2,
                reason: "odd body".into(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_keeps_messages_that_arrived_in_time() {
        let (source, handle) = ChannelSource::<&'static str>::new("slow", 4);
        let timeout = Duration::from_millis(100);
        let subscription = source.open(timeout).unwrap();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.send("msg1").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            // The loader is gone by now; the send fails and is ignored.
            let _ = handle.send("msg2").await;
        });

        let started = Instant::now();
        let loader = ExpectationLoader::new("slow", timeout);
        let expected = loader.load(subscription, &Identity).await.unwrap();

        assert_eq!(expected, ExpectationSequence::new(["msg1"]));
        let elapsed = started.elapsed();
        assert!(elapsed >= timeout && elapsed < timeout + Duration::from_millis(5), "{elapsed:?}");
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_not_reset_by_each_message() {
        let (source, handle) = ChannelSource::<u32>::new("trickle", 16);
        let subscription = source.open(Duration::ZERO).unwrap();

        tokio::spawn(async move {
            for i in 0..10 {
                tokio::time::sleep(Duration::from_millis(30)).await;
                if handle.send(i).await.is_err() {
                    break;
                }
            }
        });

        let loader = ExpectationLoader::new("trickle", Duration::from_millis(100));
        let expected = loader.load(subscription, &Identity).await.unwrap();

        // Messages at 30, 60 and 90 ms make it; the one at 120 ms does not.
        assert_eq!(expected, ExpectationSequence::new([0u32, 1, 2]));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_waits_for_end_of_stream() {
        let (source, handle) = ChannelSource::<u32>::new("forever", 4);
        let subscription = source.open(Duration::MAX).unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            handle.send(7).await.unwrap();
        });

        let loader = ExpectationLoader::new("forever", Duration::MAX);
        let expected = loader.load(subscription, &Identity).await.unwrap();
        assert_eq!(expected, ExpectationSequence::new([7u32]));
    }
}
