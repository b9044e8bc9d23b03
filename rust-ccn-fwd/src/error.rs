//! Error types for the forwarding engine.

use rust_ccn_common::types::{FaceId, ProducerId};
use thiserror::Error;

/// All possible errors raised by the forwarding tables and the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A message or name that failed to decode or validate.
    #[error(transparent)]
    Ccn(#[from] rust_ccn_common::Error),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A face that was never added or has been removed.
    #[error("Unknown face {0}")]
    UnknownFace(FaceId),

    /// A producer that was never registered or has been unregistered.
    #[error("Unknown producer {0}")]
    UnknownProducer(ProducerId),

    /// A producer failed to answer an Interest.
    #[error("Producer error: {0}")]
    Producer(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
