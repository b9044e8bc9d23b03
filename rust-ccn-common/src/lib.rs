//! Common types for the content-centric forwarder.
//!
//! This crate holds everything that is pure and shareable between the
//! forwarding tables and the surrounding applications: names, the binary
//! wire codec and its tag dictionary, Interest/ContentObject messages,
//! exclusion filters and the matching rules that decide which content
//! answers which Interest.

pub mod ccn;
pub mod ccnb;
pub mod dtag;
pub mod error;
pub mod exclude;
pub mod matcher;
pub mod metrics;
pub mod name;
pub mod types;

/// Reexport of common types
pub use ccn::{AnswerOriginKind, ChildSelector, ContentObject, Interest, Message};
pub use error::Error;
pub use exclude::{BloomFilter, ExcludeFilter};
pub use name::{Name, NameComponent};
pub type Result<T> = std::result::Result<T, Error>;
