//! Push a local file to the endpoint serving a reference.

use anyhow::{Context, Result};
use serde::Serialize;

use keel_core::descriptor::Descriptor;
use keel_store::{HttpTarget, Target};

use crate::cmd::{endpoint_for, load_config};
use crate::output;

#[derive(Debug, Serialize)]
pub struct PushOut {
    pub endpoint: String,
    pub digest: String,
    pub bytes: usize,
}

pub async fn run(config_path: &str, reference: &str, file: &str, media_type: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let (location, plain_http, skip_tls) = endpoint_for(&config, reference)?;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("read {file}"))?;
    let desc = Descriptor::from_bytes(media_type, &bytes);

    let remote = HttpTarget::new(&location, plain_http, skip_tls)?;
    remote
        .push_bytes(&desc, bytes.clone().into())
        .await
        .with_context(|| format!("push to {location}"))?;

    output::status("pushed", desc.digest.as_str());
    output::print(&PushOut {
        endpoint: location,
        digest: desc.digest.to_string(),
        bytes: bytes.len(),
    })?;
    Ok(())
}
