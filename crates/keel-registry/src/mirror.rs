//! Mirror resolution: pick the endpoint that serves a reference.
//!
//! Each registry rule contributes one match pattern (prefix, falling back to
//! location). A leading `*` means "any characters"; the remainder of the
//! pattern is handed to the regex engine as-is. The remainder is NOT escaped,
//! so wildcard-adjacent metacharacters keep their regex meaning: a literal
//! `.` in a prefix matches any character. Downstream configurations may rely
//! on this, so the behavior is preserved rather than tightened.
//!
//! Among matching rules the longest pattern string wins, so a specific
//! `*.example.com` beats a catch-all `*`. Equal lengths resolve to the first
//! entry in config order. No match is `Ok(None)`: absence is not a failure.

use regex::Regex;

use crate::config::{Registry, RegistryConfig};
use crate::errors::{RegistryError, RegistryResult};

/// Select the best-matching registry for a reference string.
///
/// A pattern that fails to compile aborts the whole call; bad rules are
/// never skipped silently.
pub fn find_registry<'a>(
    config: &'a RegistryConfig,
    reference: &str,
) -> RegistryResult<Option<&'a Registry>> {
    let mut best: Option<(usize, &Registry)> = None;

    for registry in &config.registries {
        let pattern = registry.pattern();
        if !matches_reference(pattern, reference)? {
            continue;
        }
        // Strictly greater: first-in-config-order wins ties.
        if best.map_or(true, |(len, _)| pattern.len() > len) {
            best = Some((pattern.len(), registry));
        }
    }

    Ok(best.map(|(_, r)| r))
}

fn matches_reference(pattern: &str, reference: &str) -> RegistryResult<bool> {
    let translated = match pattern.strip_prefix('*') {
        Some(rest) => format!(".*{rest}"),
        None => pattern.to_string(),
    };

    let re = Regex::new(&translated).map_err(|e| RegistryError::Pattern {
        pattern: pattern.to_string(),
        source: e,
    })?;
    Ok(re.is_match(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cfg(entries: &[(&str, &str)]) -> RegistryConfig {
        RegistryConfig::new(
            entries
                .iter()
                .map(|(loc, prefix)| Registry::new(*loc).with_prefix(*prefix))
                .collect(),
        )
    }

    #[test]
    fn longest_pattern_beats_catch_all() {
        let config = cfg(&[
            ("mirror-a.internal", "*.example.com"),
            ("mirror-b.internal", "*"),
        ]);
        let found = find_registry(&config, "reg.example.com").unwrap().unwrap();
        assert_eq!(found.location, "mirror-a.internal");
    }

    #[test]
    fn no_match_is_none_not_error() {
        let config = cfg(&[("mirror-a.internal", "*.example.com")]);
        assert!(find_registry(&config, "other.org").unwrap().is_none());
    }

    #[test]
    fn location_is_the_fallback_pattern() {
        let config = cfg(&[("registry.example.com", "")]);
        let found = find_registry(&config, "registry.example.com/ns/app")
            .unwrap()
            .unwrap();
        assert_eq!(found.location, "registry.example.com");
    }

    #[test]
    fn equal_length_ties_resolve_to_first_entry() {
        let config = cfg(&[
            ("first.internal", "*.example.com"),
            ("second.internal", "*.example.com"),
        ]);
        let found = find_registry(&config, "a.example.com").unwrap().unwrap();
        assert_eq!(found.location, "first.internal");
    }

    #[test]
    fn unescaped_dot_matches_any_character() {
        // The sharp edge, preserved: "." in the remainder is a regex
        // metacharacter, so "regXexampleYcom" still matches "*.example.com".
        let config = cfg(&[("mirror.internal", "*.example.com")]);
        let found = find_registry(&config, "regXexampleYcom").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn malformed_pattern_aborts_resolution() {
        let config = cfg(&[
            ("good.internal", "*.example.com"),
            ("bad.internal", "*[unclosed"),
        ]);
        assert_matches!(
            find_registry(&config, "reg.example.com"),
            Err(RegistryError::Pattern { ref pattern, .. }) if pattern == "*[unclosed"
        );
    }

    #[test]
    fn empty_config_matches_nothing() {
        let config = RegistryConfig::default();
        assert!(find_registry(&config, "anything").unwrap().is_none());
    }
}
