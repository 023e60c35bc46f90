use anyhow::Result;
use serde::Serialize;

use keel_store::FsTarget;

use crate::cmd::load_config;
use crate::output;

#[derive(Debug, Serialize)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorOut {
    pub ok: bool,
    pub checks: Vec<Check>,
}

pub async fn run(config_path: &str, cache_root: &str) -> Result<()> {
    let mut checks = Vec::new();

    checks.push(match load_config(config_path) {
        Ok(cfg) => Check {
            name: "registry-config".to_string(),
            ok: true,
            detail: format!("{} registries configured", cfg.registries.len()),
        },
        Err(e) => Check {
            name: "registry-config".to_string(),
            ok: false,
            detail: e.to_string(),
        },
    });

    checks.push(match FsTarget::open(cache_root) {
        Ok(store) => Check {
            name: "cache-store".to_string(),
            ok: true,
            detail: format!("writable at {}", store.root().display()),
        },
        Err(e) => Check {
            name: "cache-store".to_string(),
            ok: false,
            detail: e.to_string(),
        },
    });

    let ok = checks.iter().all(|c| c.ok);
    output::print(&DoctorOut { ok, checks })?;
    Ok(())
}
