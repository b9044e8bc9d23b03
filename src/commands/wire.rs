//! Wire format tools

use anyhow::{Context, Result};
use bytes::Bytes;
use log::info;
use rust_ccn_common::{Interest, Message, Name};
use std::path::Path;

use crate::utils::{format_bytes, preview};

/// Decode every message in `path` and print it
pub fn inspect(path: &Path) -> Result<()> {
    let raw = Bytes::from(
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
    );
    info!("Decoding {} from {}", format_bytes(raw.len()), path.display());
    let messages = Message::decode_all(raw).context("Failed to decode messages")?;

    for (i, message) in messages.iter().enumerate() {
        match message {
            Message::Interest(interest) => println!("[{}] Interest {}", i, interest),
            Message::Content(content) => {
                println!("[{}] ContentObject {}", i, content);
                println!("    {}", preview(content.content(), 64));
            }
        }
    }
    Ok(())
}

/// Encode a plain Interest for `name` into `output`
pub fn encode_interest(name: &str, output: &Path) -> Result<()> {
    let name = Name::from_uri(name).with_context(|| format!("Invalid name {}", name))?;
    let wire = Interest::new(name).to_bytes()?;
    std::fs::write(output, &wire)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} to {}", format_bytes(wire.len()), output.display());
    Ok(())
}
