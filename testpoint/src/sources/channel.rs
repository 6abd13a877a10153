use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::mpsc::{self, Receiver, Sender, error::SendError};
use tokio_stream::wrappers::ReceiverStream;

use crate::{Error, ExpectedSource, Message, Result, Subscription};

/// A one-shot source fed through a bounded channel.
///
/// Producers push messages with a [`ChannelSourceHandle`]. The stream ends
/// once every handle has been dropped and the buffered messages have been
/// drained. The receiving half is handed out on the first
/// [`open`](ExpectedSource::open); opening again fails with
/// [`Error::SourceUnavailable`] because the messages have already been
/// consumed.
///
/// Producers that outlive the load timeout are simply cut off: whatever
/// arrived before the deadline becomes the expectation sequence.
pub struct ChannelSource<B> {
    name: String,
    receiver: Mutex<Option<Receiver<Message<B>>>>,
}

/// Sending half of a [`ChannelSource`]. Cheap to clone.
pub struct ChannelSourceHandle<B> {
    name: Arc<str>,
    sender: Sender<Message<B>>,
}

impl<B> ChannelSource<B> {
    /// Create a source and the handle used to feed it.
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, ChannelSourceHandle<B>) {
        let name = name.into();
        let (tx, rx) = mpsc::channel(capacity);
        let handle = ChannelSourceHandle {
            name: Arc::from(name.as_str()),
            sender: tx,
        };
        let source = Self {
            name,
            receiver: Mutex::new(Some(rx)),
        };
        (source, handle)
    }
}

impl<B: Send + 'static> ExpectedSource<B> for ChannelSource<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, _timeout: Duration) -> Result<Subscription<B>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::unavailable(&self.name, "already consumed"))?;
        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}

impl<B> ChannelSourceHandle<B> {
    /// Send a message, waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] when the subscription has been
    /// dropped (the load phase is over).
    pub async fn send(&self, message: impl Into<Message<B>>) -> Result<()> {
        self.sender
            .send(message.into())
            .await
            .map_err(|SendError(_)| Error::unavailable(&*self.name, "subscription closed"))
    }

    /// Returns `true` once the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<B> Clone for ChannelSourceHandle<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<B> fmt::Debug for ChannelSource<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<B> fmt::Debug for ChannelSourceHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSourceHandle")
            .field("name", &self.name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn stream_ends_when_handles_are_dropped() {
        let (source, handle) = ChannelSource::<i32>::new("numbers", 8);
        let subscription = source.open(Duration::from_secs(1)).unwrap();

        handle.send(1).await.unwrap();
        handle.send(2).await.unwrap();
        drop(handle);

        let bodies: Vec<i32> = subscription.map(Message::into_body).collect().await;
        assert_eq!(bodies, vec![1, 2]);
    }

    #[tokio::test]
    async fn second_open_is_rejected() {
        let (source, _handle) = ChannelSource::<i32>::new("numbers", 1);
        let _first = source.open(Duration::ZERO).unwrap();
        let err = source.open(Duration::ZERO).err().unwrap();
        assert!(matches!(err, Error::SourceUnavailable { ref name, .. } if name == "numbers"));
    }

    #[tokio::test]
    async fn send_fails_after_subscription_is_dropped() {
        let (source, handle) = ChannelSource::<i32>::new("numbers", 1);
        drop(source.open(Duration::ZERO).unwrap());
        assert!(handle.is_closed());
        assert!(handle.send(1).await.is_err());
    }
}
