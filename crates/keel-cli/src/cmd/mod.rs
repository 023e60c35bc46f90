use anyhow::Result;

use crate::args::{Cli, Command};

mod assemble;
mod doctor;
mod fetch;
mod push;
mod resolve;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Assemble { path, max_files } => assemble::run(&path, max_files).await,
        Command::Fetch {
            reference,
            tag,
            digest,
            size,
            media_type,
            to,
        } => {
            fetch::run(
                &cli.config,
                &cli.cache_root,
                &reference,
                tag.as_deref(),
                digest.as_deref(),
                size,
                &media_type,
                to.as_deref(),
            )
            .await
        }
        Command::Push {
            reference,
            file,
            media_type,
        } => push::run(&cli.config, &reference, &file, &media_type).await,
        Command::Resolve { reference } => resolve::run(&cli.config, &reference).await,
        Command::Doctor => doctor::run(&cli.config, &cli.cache_root).await,
    }
}

/// Load the registry config, tolerating an absent default file.
pub(crate) fn load_config(path: &str) -> Result<keel_registry::RegistryConfig> {
    if !std::path::Path::new(path).exists() {
        return Ok(keel_registry::RegistryConfig::default());
    }
    Ok(keel_registry::RegistryConfig::load(path)?)
}

/// Endpoint parameters for a reference: the configured mirror if one
/// matches, otherwise the reference's own registry host.
pub(crate) fn endpoint_for(
    config: &keel_registry::RegistryConfig,
    reference: &str,
) -> Result<(String, bool, bool)> {
    match keel_registry::find_registry(config, reference)? {
        Some(r) => Ok((r.location.clone(), r.plain_http, r.skip_tls)),
        None => {
            let host = reference
                .split('/')
                .next()
                .unwrap_or(reference)
                .to_string();
            Ok((host, false, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_registry::{Registry, RegistryConfig};

    #[test]
    fn endpoint_prefers_a_matching_mirror() {
        let config = RegistryConfig::new(vec![Registry::new("mirror.internal")
            .with_prefix("*.example.com")]);
        let (loc, plain, skip) = endpoint_for(&config, "reg.example.com/ns/app").unwrap();
        assert_eq!(loc, "mirror.internal");
        assert!(!plain);
        assert!(!skip);
    }

    #[test]
    fn endpoint_falls_back_to_the_reference_host() {
        let config = RegistryConfig::default();
        let (loc, _, _) = endpoint_for(&config, "reg.example.com/ns/app").unwrap();
        assert_eq!(loc, "reg.example.com");
    }

    #[test]
    fn absent_config_file_is_an_empty_config() {
        let cfg = load_config("definitely-not-a-real-file.yaml").unwrap();
        assert!(cfg.registries.is_empty());
    }
}
