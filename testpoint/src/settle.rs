use std::{fmt, future::IntoFuture, pin::Pin, time::Duration};

use tokio::time::{Instant, timeout_at};

use crate::{ComparisonSink, Error, Extract, Result};

/// Default timeout for [`ComparisonSink::settle_on`].
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

/// A count-based settle builder.
///
/// Created by [`ComparisonSink::settle_on`]. Resolves as soon as the sink has
/// accepted at least `count` messages. If the timeout expires first, returns
/// [`Error::SettleTimeout`] with the number of messages seen so far.
///
/// # Example
///
/// ```ignore
/// // Wait until 5 messages arrived
/// sink.settle_on(5).await?;
///
/// // With a custom timeout
/// sink.settle_on(5).within(Duration::from_secs(3)).await?;
/// ```
pub struct Settle<'a, B, X> {
    sink: &'a ComparisonSink<B, X>,
    count: usize,
    timeout: Duration,
}

impl<'a, B, X: Extract<B>> Settle<'a, B, X> {
    pub(crate) fn new(sink: &'a ComparisonSink<B, X>, count: usize) -> Self {
        Self {
            sink,
            count,
            timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }

    /// Override the default 1-second timeout.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(self) -> Result {
        let deadline = Instant::now().checked_add(self.timeout);
        let received = self.sink.received_sequence();

        loop {
            // Register for the wake-up before checking, so an append landing
            // between the check and the await is not lost.
            let notified = received.notify().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let seen = received.len();
            if seen >= self.count {
                return Ok(());
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        return Err(Error::SettleTimeout(self.timeout, received.len()));
                    }
                }
                None => notified.await,
            }
        }
    }
}

impl<'a, B, X> IntoFuture for Settle<'a, B, X>
where
    B: 'a,
    X: Extract<B>,
{
    type Output = Result;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

impl<B, X> fmt::Debug for Settle<'_, B, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("sink", &self.sink.name())
            .field("count", &self.count)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ExpectationSequence;

    fn ready_sink() -> Arc<ComparisonSink<u32>> {
        let sink = ComparisonSink::new("settle");
        sink.install(ExpectationSequence::new([1u32, 2, 3])).unwrap();
        Arc::new(sink)
    }

    #[tokio::test]
    async fn condition_met_immediately() {
        let sink = ready_sink();
        sink.accept(1).unwrap();
        sink.settle_on(1).await.unwrap();
        sink.settle_on(0).await.unwrap();
    }

    #[tokio::test]
    async fn condition_met_after_several_messages() {
        let sink = ready_sink();
        let producer = {
            let sink = sink.clone();
            tokio::spawn(async move {
                for i in 1..=3 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    sink.accept(i).unwrap();
                }
            })
        };

        sink.settle_on(3).within(Duration::from_secs(2)).await.unwrap();
        assert_eq!(sink.received_count(), 3);
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_expires() {
        let sink = ready_sink();
        sink.accept(1).unwrap();

        let err = sink
            .settle_on(100)
            .within(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, Error::SettleTimeout(Duration::from_millis(50), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_is_one_second() {
        let sink = ready_sink();
        let start = Instant::now();
        let result = sink.settle_on(1).await;
        assert!(matches!(result, Err(Error::SettleTimeout(d, 0)) if d == DEFAULT_SETTLE_TIMEOUT));
        assert!(start.elapsed() >= DEFAULT_SETTLE_TIMEOUT);
    }

    #[tokio::test]
    async fn unbounded_timeout_does_not_overflow() {
        let sink = ready_sink();
        let producer = {
            let sink = sink.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                sink.accept(1).unwrap();
            })
        };

        sink.settle_on(1).within(Duration::MAX).await.unwrap();
        producer.await.unwrap();
    }

    #[test]
    fn debug_shows_sink_name_and_target() {
        let sink = ready_sink();
        let shown = format!("{:?}", sink.settle_on(2).within(Duration::from_millis(20)));
        assert!(shown.contains("\"settle\""), "{shown}");
        assert!(shown.contains("count: 2"), "{shown}");
    }
}
