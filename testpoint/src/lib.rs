#![cfg_attr(docsrs, feature(doc_cfg))]
//! # testpoint
//!
//! Capture expected messages from a source once at startup, then verify that
//! live traffic matches them.
//!
//! A [`TestEndpoint`] resolves a named [`ExpectedSource`] from a
//! [`SourceRegistry`], drains it on start (bounded by a timeout) into an
//! ordered [`ExpectationSequence`], and installs that into a
//! [`ComparisonSink`]. Delivery tasks then feed the sink with
//! [`accept`](ComparisonSink::accept); the test calls
//! [`verify`](ComparisonSink::verify) to check that the received payloads
//! equal the expected ones, in order.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use testpoint::*;
//!
//! #[tokio::main]
//! async fn main() -> Result {
//!     let mut registry = SourceRegistry::new();
//!     registry.register(sources::VecSource::new("orders", vec!["created", "paid"]))?;
//!
//!     let config = Config::new("orders").with_timeout(Duration::from_millis(500));
//!     let mut endpoint = TestEndpoint::new(config, &registry)?;
//!     endpoint.initialize()?;
//!     endpoint.start().await?;
//!
//!     let sink = endpoint.sink();
//!     tokio::spawn(async move {
//!         sink.accept("created")?;
//!         sink.accept("paid")
//!     });
//!
//!     endpoint.verify_within(Duration::from_secs(1)).await
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TestEndpoint`] | Lifecycle glue: resolve, load, install, verify |
//! | [`ComparisonSink`] | Records live messages and compares them to expectations |
//! | [`ExpectationLoader`] | Drains a source into an [`ExpectationSequence`] within a deadline |
//! | [`ExpectedSource`] | Producer of expected messages, see [`sources`] for built-ins |
//! | [`SourceRegistry`] | Name → source lookup |
//! | [`Message`] | Body plus [`Meta`] (id, timestamp, headers) |
//! | [`Payload`] | Canonical comparison value |
//! | [`Extract`] | Turns bodies into payloads ([`Identity`], [`Utf8`], closures) |
//! | [`Mismatch`] | First divergence reported by a failed verification |
//!
//! ## Comparison
//!
//! Verification succeeds only if both sequences have the same length and every
//! pair of payloads is structurally equal, in order. A failure reports the first
//! divergent index with the expected and actual values, or marks the element
//! as missing, extra, or unextractable.
//!
//! ## Features
//!
//! - **`serde`** - `Serialize`/`Deserialize` for [`Config`] (timeout in
//!   milliseconds), [`Payload`], [`Message`], and `From<serde_json::Value>`
//!   for [`Payload`]

mod config;
mod endpoint;
mod error;
mod extract;
mod loader;
mod message;
mod meta;
mod mismatch;
mod payload;
mod registry;
mod sequence;
mod settle;
mod sink;
mod sink_state;
mod source;

pub mod sources;

pub use config::Config;
pub use endpoint::TestEndpoint;
pub use error::{Error, ExtractError};
pub use extract::{Extract, Identity, Utf8};
pub use loader::ExpectationLoader;
pub use message::Message;
pub use meta::{MessageId, Meta};
pub use mismatch::{Mismatch, MismatchKind};
pub use payload::Payload;
pub use registry::SourceRegistry;
pub use sequence::{ExpectationSequence, Received};
pub use settle::{DEFAULT_SETTLE_TIMEOUT, Settle};
pub use sink::ComparisonSink;
pub use sink_state::SinkState;
pub use source::{ExpectedSource, Subscription};

/// Convenience alias for `Result<T, testpoint::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
