//! Long-running forwarder

use anyhow::{Context, Result};
use log::info;
use rust_ccn_fwd::{Forwarder, ForwarderConfig};
use std::{path::Path, time::Instant};

use crate::utils::{format_duration, print_header};

/// Run the forwarder until Ctrl-C, then print its metrics
pub async fn run_forwarder(config_path: Option<&Path>) -> Result<()> {
    let config = ForwarderConfig::load(config_path).context("Failed to load configuration")?;
    let forwarder = Forwarder::new(config).context("Failed to start forwarder")?;

    if let Some(id) = forwarder
        .register_static_content()
        .await
        .context("Failed to load static content")?
    {
        info!("Static content served by {}", id);
    }

    let started = Instant::now();
    let housekeeping = forwarder.spawn_housekeeping();
    info!("Forwarder running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    housekeeping.abort();

    print_header("Forwarder statistics");
    println!("Uptime: {}", format_duration(started.elapsed()));
    println!("Pending entries: {}", forwarder.pending_entries().await);
    println!("Cached objects: {}", forwarder.cached_entries().await);
    let snapshot = forwarder.metrics().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
