//! Forwarding tables and engine for the content-centric forwarder.
//!
//! The crate holds the Pending Interest Table, the Content Store, the
//! producer registry and the [`Forwarder`] that drives them. Faces and
//! producers talk to the forwarder through async methods and channels; the
//! tables themselves are plain synchronous structures.

pub mod config;
pub mod cs;
pub mod error;
pub mod forwarder;
pub mod pit;
pub mod producer;

pub use config::{ForwarderConfig, StaticContent};
pub use cs::ContentStore;
pub use error::{Error, Result};
pub use forwarder::{ContentOutcome, FaceEvent, Forwarder, InterestOutcome};
pub use pit::{Pit, PitInsert, PitKey};
pub use producer::{Producer, ProducerRegistry, StaticProducer};
