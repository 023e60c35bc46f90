//! Show which configured mirror serves a reference.

use anyhow::Result;
use serde::Serialize;

use keel_registry::find_registry;

use crate::cmd::load_config;
use crate::output;

#[derive(Debug, Serialize)]
pub struct ResolveOut {
    pub reference: String,
    pub matched: bool,
    pub location: Option<String>,
    pub pattern: Option<String>,
    pub plain_http: bool,
    pub skip_tls: bool,
}

pub async fn run(config_path: &str, reference: &str) -> Result<()> {
    let config = load_config(config_path)?;

    let out = match find_registry(&config, reference)? {
        Some(registry) => ResolveOut {
            reference: reference.to_string(),
            matched: true,
            location: Some(registry.location.clone()),
            pattern: Some(registry.pattern().to_string()),
            plain_http: registry.plain_http,
            skip_tls: registry.skip_tls,
        },
        None => ResolveOut {
            reference: reference.to_string(),
            matched: false,
            location: None,
            pattern: None,
            plain_http: false,
            skip_tls: false,
        },
    };

    match &out.location {
        Some(loc) => output::status("mirror", loc),
        None => output::status("mirror", "none (reference host is used directly)"),
    }
    output::print(&out)?;
    Ok(())
}
