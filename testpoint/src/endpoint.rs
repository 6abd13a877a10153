use std::{fmt, sync::Arc, time::Duration};

use crate::{
    ComparisonSink, Config, Error, ExpectationLoader, ExpectedSource, Extract, Identity, Message,
    Result, SinkState, SourceRegistry, Subscription,
};

/// Owns the lifecycle of one comparison sink and its expectation source.
///
/// # Lifecycle
///
/// - [`new()`](Self::new) resolves the source by name from a [`SourceRegistry`].
/// - [`initialize()`](Self::initialize) opens the source's subscription.
/// - [`start()`](Self::start) drains it (bounded by [`Config::timeout`]) and
///   installs the result. Only then does the sink accept live messages.
/// - [`sink()`](Self::sink) hands out the shared sink to delivery tasks;
///   [`verify()`](Self::verify) checks the outcome.
///
/// A failure in `initialize` or `start` means the endpoint cannot be used:
/// the sink has no expectations and rejects traffic with [`Error::NotReady`].
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> testpoint::Result {
/// use testpoint::{Config, SourceRegistry, TestEndpoint, sources::VecSource};
///
/// let mut registry = SourceRegistry::new();
/// registry.register(VecSource::new("greetings", vec!["hello", "world"]))?;
///
/// let mut endpoint = TestEndpoint::new(Config::new("greetings"), &registry)?;
/// endpoint.initialize()?;
/// endpoint.start().await?;
///
/// endpoint.accept("hello")?;
/// endpoint.accept("world")?;
/// endpoint.verify()?;
/// # Ok(())
/// # }
/// ```
pub struct TestEndpoint<B, X = Identity> {
    config: Config,
    source: Arc<dyn ExpectedSource<B>>,
    subscription: Option<Subscription<B>>,
    sink: Arc<ComparisonSink<B, X>>,
}

impl<B> TestEndpoint<B, Identity>
where
    Identity: Extract<B>,
{
    /// Create an endpoint comparing bodies as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if `config.name()` is not registered.
    pub fn new(config: Config, registry: &SourceRegistry<B>) -> Result<Self> {
        Self::with_extractor(config, registry, Identity)
    }
}

impl<B, X: Extract<B>> TestEndpoint<B, X> {
    /// Create an endpoint whose expected and live bodies both go through
    /// `extractor` before comparison.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if `config.name()` is not registered.
    pub fn with_extractor(config: Config, registry: &SourceRegistry<B>, extractor: X) -> Result<Self> {
        let source = registry.resolve(config.name())?;
        let sink = ComparisonSink::with_extractor(config.name(), extractor);
        Ok(Self {
            config,
            source,
            subscription: None,
            sink: Arc::new(sink),
        })
    }

    /// Open the expectation source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the source cannot be opened, or
    /// [`Error::AlreadyInitialized`] on any call after the first: an endpoint
    /// loads its expectations at most once, even if that attempt failed.
    pub fn initialize(&mut self) -> Result<()> {
        self.sink.begin_loading()?;
        let subscription = self.source.open(self.config.timeout())?;
        self.subscription = Some(subscription);
        tracing::debug!(endpoint = %self.config.name(), source = %self.source.name(), "endpoint initialized");
        Ok(())
    }

    /// Load the expectations and make the sink ready.
    ///
    /// Waits for the source to finish or for the configured timeout, whichever
    /// comes first. Nothing is accepted by the sink until this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if [`initialize`](Self::initialize)
    /// has not been called, and [`Error::PayloadExtraction`] if an expected
    /// body cannot be extracted.
    pub async fn start(&mut self) -> Result<()> {
        let subscription = self.subscription.take().ok_or(Error::NotInitialized)?;
        let loader = ExpectationLoader::new(self.source.name(), self.config.timeout());
        let expected = loader.load(subscription, self.sink.extractor()).await?;
        self.sink.install(expected)?;
        tracing::debug!(endpoint = %self.config.name(), "endpoint started");
        Ok(())
    }

    /// Shared handle to the sink, for delivery tasks.
    pub fn sink(&self) -> Arc<ComparisonSink<B, X>> {
        self.sink.clone()
    }

    /// Shorthand for `self.sink().accept(message)`.
    pub fn accept(&self, message: impl Into<Message<B>>) -> Result<u64> {
        self.sink.accept(message)
    }

    /// Shorthand for `self.sink().verify()`.
    pub fn verify(&self) -> Result<()> {
        self.sink.verify()
    }

    /// Shorthand for `self.sink().verify_within(timeout)`.
    pub async fn verify_within(&self, timeout: Duration) -> Result<()> {
        self.sink.verify_within(timeout).await
    }

    pub fn state(&self) -> SinkState {
        self.sink.state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

impl<B, X> fmt::Debug for TestEndpoint<B, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEndpoint")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .field("initialized", &self.subscription.is_some())
            .field("sink", &self.sink)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExtractError, Payload, sources::{ChannelSource, VecSource}};

    fn registry(bodies: Vec<&'static str>) -> SourceRegistry<&'static str> {
        let mut registry = SourceRegistry::new();
        registry.register(VecSource::new("expected", bodies)).unwrap();
        registry
    }

    #[tokio::test]
    async fn full_lifecycle_verifies() {
        let registry = registry(vec!["hello", "world"]);
        let mut endpoint = TestEndpoint::new(Config::new("expected"), &registry).unwrap();
        assert_eq!(endpoint.state(), SinkState::Uninitialized);

        endpoint.initialize().unwrap();
        assert_eq!(endpoint.state(), SinkState::Loading);

        endpoint.start().await.unwrap();
        assert_eq!(endpoint.state(), SinkState::Ready);

        let sink = endpoint.sink();
        sink.accept("hello").unwrap();
        sink.accept("world").unwrap();
        assert_eq!(endpoint.verify(), Ok(()));
        assert_eq!(endpoint.state(), SinkState::Verified);
    }

    #[test]
    fn unknown_source_fails_construction() {
        let registry = registry(vec![]);
        let err = TestEndpoint::new(Config::new("nope"), &registry).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { ref name, .. } if name == "nope"));
    }

    #[tokio::test]
    async fn start_requires_initialize() {
        let registry = registry(vec!["a"]);
        let mut endpoint = TestEndpoint::new(Config::new("expected"), &registry).unwrap();
        assert_eq!(endpoint.start().await, Err(Error::NotInitialized));
        assert_eq!(endpoint.accept("a"), Err(Error::NotReady));
    }

    #[tokio::test]
    async fn cannot_initialize_after_start() {
        let registry = registry(vec!["a"]);
        let mut endpoint = TestEndpoint::new(Config::new("expected"), &registry).unwrap();
        endpoint.initialize().unwrap();
        endpoint.start().await.unwrap();
        assert_eq!(endpoint.initialize(), Err(Error::AlreadyInitialized));
    }

    #[test]
    fn consumed_source_fails_initialize() {
        let (source, _handle) = ChannelSource::<&'static str>::new("once", 1);
        let mut registry = SourceRegistry::new();
        registry.register(source).unwrap();

        let mut first = TestEndpoint::new(Config::new("once"), &registry).unwrap();
        first.initialize().unwrap();

        let mut second = TestEndpoint::new(Config::new("once"), &registry).unwrap();
        let err = second.initialize().unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn extraction_failure_aborts_start() {
        let registry = registry(vec!["ok", "", "ok"]);
        let non_empty = |m: &Message<&'static str>| -> std::result::Result<Payload, ExtractError> {
            if m.body().is_empty() {
                Err(ExtractError::new("empty body"))
            } else {
                Ok(Payload::from(*m.body()))
            }
        };
        let mut endpoint =
            TestEndpoint::with_extractor(Config::new("expected"), &registry, non_empty).unwrap();
        endpoint.initialize().unwrap();

        let err = endpoint.start().await.unwrap_err();
        assert!(matches!(err, Error::PayloadExtraction { index: 1, .. }));
        assert_eq!(endpoint.accept("ok"), Err(Error::NotReady));
    }

    #[tokio::test]
    async fn failed_start_is_not_retried() {
        let registry = registry(vec![""]);
        let non_empty = |m: &Message<&'static str>| -> std::result::Result<Payload, ExtractError> {
            if m.body().is_empty() {
                Err(ExtractError::new("empty body"))
            } else {
                Ok(Payload::from(*m.body()))
            }
        };
        let mut endpoint =
            TestEndpoint::with_extractor(Config::new("expected"), &registry, non_empty).unwrap();
        endpoint.initialize().unwrap();
        assert!(endpoint.start().await.is_err());

        assert_eq!(endpoint.initialize(), Err(Error::AlreadyInitialized));
        assert_eq!(endpoint.start().await, Err(Error::NotInitialized));
        assert_eq!(endpoint.state(), SinkState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_bounded_by_timeout() {
        let (source, handle) = ChannelSource::<&'static str>::new("slow", 4);
        let mut registry = SourceRegistry::new();
        registry.register(source).unwrap();

        handle.send("first").await.unwrap();
        // The handle stays alive, so the stream never ends on its own.
        let mut endpoint =
            TestEndpoint::new(Config::new("slow").with_timeout_millis(100), &registry).unwrap();
        endpoint.initialize().unwrap();
        endpoint.start().await.unwrap();

        assert_eq!(endpoint.sink().expected().unwrap().len(), 1);
        drop(handle);
    }
}
