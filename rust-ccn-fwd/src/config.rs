//! Configuration for the forwarding engine.
//!
//! Settings come from an optional file (TOML, YAML or JSON, picked by
//! extension) overlaid by `CCND__*` environment variables, e.g.
//! `CCND__CS_CAPACITY=1024`.

use crate::error::{Error, Result};
use config::{Config, ConfigError, Environment, File, FileFormat};
use log::debug;
use rust_ccn_common::{
    types::{DEFAULT_INTEREST_LIFETIME_MS, MAX_CS_ENTRIES, MAX_INTEREST_LIFETIME_MS},
    ContentObject, Name,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CCND";

/// Forwarder configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Content store capacity, in entries
    pub cs_capacity: usize,

    /// Lifetime of Interests that carry none (in milliseconds)
    pub default_interest_lifetime_ms: u64,

    /// Upper bound on any Interest lifetime (in milliseconds)
    pub max_interest_lifetime_ms: u64,

    /// Period of the expiry and stale-reclaim sweep (in milliseconds)
    pub housekeeping_interval_ms: u64,

    /// Capacity of each face's event channel
    pub face_event_buffer: usize,

    /// Content served by the built-in static producer
    pub static_content: Vec<StaticContent>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            cs_capacity: MAX_CS_ENTRIES,
            default_interest_lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            max_interest_lifetime_ms: MAX_INTEREST_LIFETIME_MS,
            housekeeping_interval_ms: 250,
            face_event_buffer: 100,
            static_content: Vec::new(),
        }
    }
}

impl ForwarderConfig {
    /// Load the configuration from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configuration from a string in the given format.
    pub fn from_text(text: &str, format: FileFormat) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(text, format))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the tables cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::Config(ConfigError::Message(msg.to_string())));
        if self.cs_capacity == 0 {
            return invalid("cs_capacity must be at least 1");
        }
        if self.face_event_buffer == 0 {
            return invalid("face_event_buffer must be at least 1");
        }
        if self.housekeeping_interval_ms == 0 {
            return invalid("housekeeping_interval_ms must be at least 1");
        }
        if self.default_interest_lifetime_ms > self.max_interest_lifetime_ms {
            return invalid("default_interest_lifetime_ms exceeds max_interest_lifetime_ms");
        }
        Ok(())
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_millis(self.housekeeping_interval_ms)
    }

    /// The PIT lifetime for an Interest asking for `requested`: the default
    /// when absent, clamped to the configured maximum.
    pub fn interest_lifetime(&self, requested: Option<Duration>) -> Duration {
        let max = Duration::from_millis(self.max_interest_lifetime_ms);
        requested
            .unwrap_or(Duration::from_millis(self.default_interest_lifetime_ms))
            .min(max)
    }
}

/// One named object served by the static producer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticContent {
    /// Full name of the object (URI form)
    pub name: String,

    /// Inline UTF-8 payload
    pub text: Option<String>,

    /// Path of a file holding the payload
    pub file: Option<PathBuf>,

    /// Staleness hint (in seconds)
    pub freshness_seconds: Option<u64>,

    /// Publisher identifier attached to the object
    pub publisher: Option<String>,
}

impl StaticContent {
    /// Build the content object this entry describes.
    pub fn to_content_object(&self) -> Result<ContentObject> {
        let name = Name::from_uri(&self.name)?;
        let payload = match (&self.text, &self.file) {
            (Some(text), None) => text.clone().into_bytes(),
            (None, Some(path)) => std::fs::read(path)?,
            _ => {
                return Err(Error::Config(ConfigError::Message(format!(
                    "static content {} needs exactly one of text or file",
                    self.name
                ))))
            }
        };
        let mut content = ContentObject::new(name, payload);
        if let Some(secs) = self.freshness_seconds {
            content = content.with_freshness(Duration::from_secs(secs));
        }
        if let Some(publisher) = &self.publisher {
            content = content.with_publisher_id(publisher.clone().into_bytes());
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ForwarderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cs_capacity, 4096);
        assert_eq!(config.interest_lifetime(None), Duration::from_millis(4000));
    }

    #[test]
    fn test_lifetime_is_clamped() {
        let config = ForwarderConfig::default();
        assert_eq!(
            config.interest_lifetime(Some(Duration::from_secs(3600))),
            Duration::from_millis(120_000)
        );
        assert_eq!(
            config.interest_lifetime(Some(Duration::from_millis(10))),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            cs_capacity = 16
            housekeeping_interval_ms = 50

            [[static_content]]
            name = "/hello/world"
            text = "hi"
            freshness_seconds = 5
        "#;
        let config = ForwarderConfig::from_text(text, FileFormat::Toml).unwrap();
        assert_eq!(config.cs_capacity, 16);
        assert_eq!(config.face_event_buffer, 100);
        assert_eq!(config.static_content.len(), 1);

        let content = config.static_content[0].to_content_object().unwrap();
        assert_eq!(content.name().to_string(), "/hello/world");
        assert_eq!(content.freshness(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ForwarderConfig::from_text("cs_capacity = 0", FileFormat::Toml),
            Err(Error::Config(_))
        ));
        let text = "default_interest_lifetime_ms = 10\nmax_interest_lifetime_ms = 5";
        assert!(ForwarderConfig::from_text(text, FileFormat::Toml).is_err());
    }

    #[test]
    fn test_static_content_needs_one_payload() {
        let entry = StaticContent {
            name: "/a".into(),
            ..StaticContent::default()
        };
        assert!(matches!(entry.to_content_object(), Err(Error::Config(_))));

        let bad_name = StaticContent {
            name: "/a/.".into(),
            text: Some("x".into()),
            ..StaticContent::default()
        };
        assert!(matches!(bad_name.to_content_object(), Err(Error::Ccn(_))));
    }
}
