//! Registry endpoint configuration.
//!
//! A `RegistryConfig` is an ordered list of endpoint rules evaluated per
//! lookup; there is no persisted state beyond the in-memory list. Order
//! matters: equal-length pattern matches resolve to the earlier entry.
//!
//! Files are loaded from YAML or JSON, selected by extension.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, RegistryResult};

/// A configured remote endpoint, optionally guarded by a match prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Endpoint location, e.g. `registry.example.com` or a full base URL.
    pub location: String,

    /// Match pattern for references. Empty means "match by location".
    /// A leading `*` is a wildcard for any characters.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    /// Skip TLS certificate verification when talking to this endpoint.
    #[serde(default)]
    pub skip_tls: bool,

    /// Use plain HTTP instead of HTTPS.
    #[serde(default)]
    pub plain_http: bool,
}

impl Registry {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            prefix: String::new(),
            skip_tls: false,
            plain_http: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The match pattern for this entry: prefix if non-empty, else location.
    pub fn pattern(&self) -> &str {
        if self.prefix.is_empty() {
            &self.location
        } else {
            &self.prefix
        }
    }
}

/// Ordered list of registry rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub registries: Vec<Registry>,
}

impl RegistryConfig {
    pub fn new(registries: Vec<Registry>) -> Self {
        Self { registries }
    }

    /// Parse a YAML document.
    pub fn from_yaml(path: &str, text: &str) -> RegistryResult<Self> {
        serde_yaml::from_str(text).map_err(|e| RegistryError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a JSON document.
    pub fn from_json(path: &str, text: &str) -> RegistryResult<Self> {
        serde_json::from_str(text).map_err(|e| RegistryError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config file, dispatching on extension (`.yaml`/`.yml`/`.json`).
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| RegistryError::Read {
            path: display.clone(),
            source: e,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&display, &text),
            Some("json") => Self::from_json(&display, &text),
            _ => Err(RegistryError::UnsupportedFormat { path: display }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn pattern_falls_back_to_location() {
        let r = Registry::new("registry.example.com");
        assert_eq!(r.pattern(), "registry.example.com");
        let r = r.with_prefix("*.example.com");
        assert_eq!(r.pattern(), "*.example.com");
    }

    #[test]
    fn yaml_roundtrip() {
        let text = r#"
registries:
  - location: mirror.internal:5000
    prefix: "*.example.com"
    plainHttp: true
  - location: registry.example.com
"#;
        let cfg = RegistryConfig::from_yaml("inline", text).unwrap();
        assert_eq!(cfg.registries.len(), 2);
        assert!(cfg.registries[0].plain_http);
        assert!(!cfg.registries[0].skip_tls);
        assert_eq!(cfg.registries[1].prefix, "");
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("registries.yaml");
        let mut f = std::fs::File::create(&yaml).unwrap();
        writeln!(f, "registries:\n  - location: a.example.com").unwrap();
        let cfg = RegistryConfig::load(&yaml).unwrap();
        assert_eq!(cfg.registries[0].location, "a.example.com");

        let json = dir.path().join("registries.json");
        std::fs::write(&json, r#"{"registries":[{"location":"b.example.com"}]}"#).unwrap();
        let cfg = RegistryConfig::load(&json).unwrap();
        assert_eq!(cfg.registries[0].location, "b.example.com");

        let toml = dir.path().join("registries.toml");
        std::fs::write(&toml, "x = 1").unwrap();
        assert_matches!(
            RegistryConfig::load(&toml),
            Err(RegistryError::UnsupportedFormat { .. })
        );
    }
}
