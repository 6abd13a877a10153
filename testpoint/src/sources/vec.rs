use std::time::Duration;

use futures_util::stream;

use crate::{ExpectedSource, Message, Result, Subscription};

/// A source that replays a fixed list of bodies every time it is opened.
#[derive(Debug, Clone)]
pub struct VecSource<B> {
    name: String,
    bodies: Vec<B>,
}

impl<B> VecSource<B> {
    pub fn new(name: impl Into<String>, bodies: Vec<B>) -> Self {
        Self {
            name: name.into(),
            bodies,
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl<B> ExpectedSource<B> for VecSource<B>
where
    B: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, _timeout: Duration) -> Result<Subscription<B>> {
        let messages: Vec<_> = self.bodies.iter().cloned().map(Message::new).collect();
        Ok(Box::pin(stream::iter(messages)))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn replays_bodies_in_order() {
        let source = VecSource::new("letters", vec!["a", "b", "c"]);
        let bodies: Vec<_> = source
            .open(Duration::from_secs(1))
            .unwrap()
            .map(Message::into_body)
            .collect()
            .await;
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn can_be_opened_twice() {
        let source = VecSource::new("letters", vec![1, 2]);
        let first = source.open(Duration::ZERO).unwrap().count().await;
        let second = source.open(Duration::ZERO).unwrap().count().await;
        assert_eq!((first, second), (2, 2));
    }
}
