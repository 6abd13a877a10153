use std::{collections::HashMap, fmt, sync::Arc};

use crate::{Error, ExpectedSource, Result};

/// Name → source lookup used to resolve a [`TestEndpoint`](crate::TestEndpoint)'s
/// expectation source.
///
/// Resolution happens once, when the endpoint is constructed; the registry
/// can be dropped or reused afterwards.
///
/// # Example
///
/// ```rust
/// use testpoint::{SourceRegistry, sources::VecSource};
///
/// let mut registry = SourceRegistry::new();
/// registry.register(VecSource::new("greetings", vec!["hello"]))?;
/// registry.register_as("aliased", VecSource::new("greetings", vec!["hi"]))?;
///
/// assert!(registry.resolve("greetings").is_ok());
/// assert!(registry.resolve("unknown").is_err());
/// # Ok::<(), testpoint::Error>(())
/// ```
pub struct SourceRegistry<B> {
    sources: HashMap<String, Arc<dyn ExpectedSource<B>>>,
}

impl<B> SourceRegistry<B> {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Register a source under its own [`name`](ExpectedSource::name).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSource`] if the name is already taken.
    pub fn register<S>(&mut self, source: S) -> Result<()>
    where
        S: ExpectedSource<B> + 'static,
    {
        let name = source.name().to_owned();
        self.insert(name, Arc::new(source))
    }

    /// Register a source under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSource`] if the name is already taken.
    pub fn register_as<S>(&mut self, name: &str, source: S) -> Result<()>
    where
        S: ExpectedSource<B> + 'static,
    {
        self.insert(name.to_owned(), Arc::new(source))
    }

    /// Register an already shared source under an explicit name.
    pub fn register_shared(&mut self, name: &str, source: Arc<dyn ExpectedSource<B>>) -> Result<()> {
        self.insert(name.to_owned(), source)
    }

    fn insert(&mut self, name: String, source: Arc<dyn ExpectedSource<B>>) -> Result<()> {
        if self.sources.contains_key(&name) {
            return Err(Error::DuplicateSource(name));
        }
        tracing::trace!(source = %name, "source registered");
        self.sources.insert(name, source);
        Ok(())
    }

    /// Look up a source by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ExpectedSource<B>>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unavailable(name, "not found in registry"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<B> Default for SourceRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> fmt::Debug for SourceRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
