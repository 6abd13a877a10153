use std::time::Duration;

/// Endpoint configuration.
///
/// Names the expectation source to resolve from the
/// [`SourceRegistry`](crate::SourceRegistry) and bounds how long the load
/// phase may wait for it. Use the builder methods to customize.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use testpoint::Config;
///
/// let config = Config::new("expected-orders")
///     .with_timeout(Duration::from_millis(500));
///
/// assert_eq!(config.name(), "expected-orders");
/// assert_eq!(config.timeout(), Duration::from_millis(500));
/// assert_eq!(Config::new("x").timeout(), Config::DEFAULT_TIMEOUT);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Name of the expectation source in the registry.
    name: String,

    /// How long the load phase waits for the source before it gives up and
    /// keeps whatever arrived.
    /// Default: 2000 ms
    #[cfg_attr(feature = "serde", serde(with = "millis", default = "default_timeout"))]
    timeout: Duration,
}

impl Config {
    /// Default load-phase timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the load-phase timeout.
    ///
    /// A zero timeout is allowed: the loader then only keeps messages the
    /// source can produce without waiting.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shorthand for `with_timeout(Duration::from_millis(ms))`.
    pub fn with_timeout_millis(self, ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(ms))
    }

    /// Returns the name of the expectation source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the load-phase timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(feature = "serde")]
fn default_timeout() -> Duration {
    Config::DEFAULT_TIMEOUT
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
