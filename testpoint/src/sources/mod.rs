//! Ready-to-use [`ExpectedSource`](crate::ExpectedSource) implementations.
//!
//! # Available Sources
//!
//! - [`VecSource`] - A fixed list of bodies, re-openable
//! - [`ChannelSource`] - Messages pushed through a channel, one-shot
//! - [`DirectorySource`] - One message per file in a directory, sorted by name
//!
//! # Example
//!
//! ```rust
//! use testpoint::{SourceRegistry, sources::VecSource};
//!
//! let mut registry = SourceRegistry::new();
//! registry.register(VecSource::new("greetings", vec!["hello", "world"]))?;
//! # Ok::<(), testpoint::Error>(())
//! ```

mod vec;
pub use vec::VecSource;

mod channel;
pub use channel::{ChannelSource, ChannelSourceHandle};

mod directory;
pub use directory::{DirectorySource, FILE_NAME_HEADER};
