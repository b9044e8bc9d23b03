//! Error types for the CCN core.

use thiserror::Error;

/// All possible errors raised by names, the wire codec and message construction.
///
/// "No match" and "Interest expired" are ordinary outcomes and never show up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A name could not be parsed or decoded.
    #[error("Malformed name: {0}")]
    MalformedName(String),

    /// Unparseable wire bytes or a structurally invalid element.
    #[error("Codec error: {0}")]
    Codec(String),

    /// A numeric tag code that is not in the dictionary (decode path).
    #[error("Unknown dictionary tag code {0}")]
    UnknownDtag(u32),

    /// A symbolic tag name that is not in the dictionary (encode path).
    #[error("Unknown dictionary tag name {0:?}")]
    UnknownTag(String),

    /// Selectors that cannot be satisfied together.
    #[error("Selector conflict: min suffix {min} > max suffix {max}")]
    SelectorConflict { min: usize, max: usize },

    /// Any other invalid selector value.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Component access beyond the end of a name.
    #[error("Component index {index} out of range for name with {len} components")]
    IndexOutOfRange { index: usize, len: usize },

    /// Bloom filter parameters that cannot be represented.
    #[error("Invalid Bloom filter: {0}")]
    InvalidBloom(String),
}
