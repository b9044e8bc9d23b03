//! Express one Interest against an in-process forwarder

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use rust_ccn_common::{ChildSelector, ExcludeFilter, Interest, Name};
use rust_ccn_fwd::{FaceEvent, Forwarder, ForwarderConfig, InterestOutcome};
use serde::Serialize;
use std::{path::Path, time::{Duration, Instant}};

use crate::utils::{format_bytes, format_duration, preview};

/// Interest parameters taken from the command line
pub struct Request {
    pub name: String,
    pub timeout_ms: u64,
    pub min_suffix: Option<usize>,
    pub max_suffix: Option<usize>,
    pub rightmost: bool,
    pub exclude: Vec<String>,
    pub json: bool,
}

impl Request {
    fn to_interest(&self) -> Result<Interest> {
        let name = Name::from_uri(&self.name)
            .with_context(|| format!("Invalid name {}", self.name))?;
        let mut interest = Interest::new(name)
            .with_lifetime(Duration::from_millis(self.timeout_ms))
            .with_nonce(nonce());
        if let Some(min) = self.min_suffix {
            interest = interest.with_min_suffix(min)?;
        }
        if let Some(max) = self.max_suffix {
            interest = interest.with_max_suffix(max)?;
        }
        if self.rightmost {
            interest = interest.with_child_selector(ChildSelector::RightmostDescendant)?;
        }
        if !self.exclude.is_empty() {
            let filter = self
                .exclude
                .iter()
                .fold(ExcludeFilter::new(), |f, c| f.with_component(c.as_str()));
            interest = interest.with_exclude(filter);
        }
        Ok(interest)
    }
}

/// Answer printed with `--json`
#[derive(Serialize)]
struct Answer {
    name: String,
    size: usize,
    elapsed_ms: u128,
    payload: String,
}

/// Express the Interest and print whatever answers it
pub async fn express_interest(config_path: Option<&Path>, request: Request) -> Result<()> {
    let interest = request.to_interest()?;
    let config = ForwarderConfig::load(config_path).context("Failed to load configuration")?;
    let forwarder = Forwarder::new(config)?;
    forwarder.register_static_content().await?;
    let _housekeeping = forwarder.spawn_housekeeping();

    let (face, mut events) = forwarder.add_face().await;
    info!("Expressing {}", interest);
    let started = Instant::now();

    match forwarder.on_interest(face, interest.clone()).await? {
        InterestOutcome::NotFound => bail!("No cached answer for {}", interest.name()),
        outcome => debug!("Interest outcome: {:?}", outcome),
    }

    let event = events
        .recv()
        .await
        .ok_or_else(|| anyhow!("Forwarder closed the face"))?;
    let elapsed = started.elapsed();

    match event {
        FaceEvent::Content(content) => {
            if request.json {
                let answer = Answer {
                    name: content.name().to_string(),
                    size: content.content().len(),
                    elapsed_ms: elapsed.as_millis(),
                    payload: preview(content.content(), 4096),
                };
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("Received: {}", content.name());
                println!("  Size: {}", format_bytes(content.content().len()));
                println!("  Time: {}", format_duration(elapsed));
                println!("  Content: {}", preview(content.content(), 256));
            }
            Ok(())
        }
        FaceEvent::Timeout(_) => bail!(
            "Interest for {} timed out after {}",
            interest.name(),
            format_duration(elapsed)
        ),
    }
}

/// A nonce unique enough for one process
fn nonce() -> Vec<u8> {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    (nanos as u64).to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> Request {
        Request {
            name: name.into(),
            timeout_ms: 100,
            min_suffix: None,
            max_suffix: None,
            rightmost: false,
            exclude: Vec::new(),
            json: false,
        }
    }

    #[test]
    fn test_request_to_interest() {
        let mut req = request("/a/b");
        req.min_suffix = Some(1);
        req.rightmost = true;
        req.exclude = vec!["x".into()];
        let interest = req.to_interest().unwrap();
        assert_eq!(interest.name().to_string(), "/a/b");
        assert_eq!(interest.min_suffix(), Some(1));
        assert_eq!(interest.child_selector(), ChildSelector::RightmostDescendant);
        assert!(interest.exclude().is_some());
        assert_eq!(interest.lifetime(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_conflicting_suffix_rejected() {
        let mut req = request("/a");
        req.min_suffix = Some(3);
        req.max_suffix = Some(1);
        assert!(req.to_interest().is_err());
    }
}
