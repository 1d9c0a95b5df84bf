//! Compile-time registry of named configuration profiles.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a deployment means adding a TOML file in `profiles/` and an
//! entry here.

use crate::config::PipelineConfig;

/// Name of the profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// Number of registered profiles. Enforced by a test.
#[cfg(test)]
const EXPECTED_PROFILE_COUNT: usize = 3;

/// Embedded TOML profile definitions.
const PROFILE_TOMLS: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.toml")),
    ("compact", include_str!("../profiles/compact.toml")),
    ("popcount", include_str!("../profiles/popcount.toml")),
];

/// Returns all registered profiles.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse or validate. These are
/// compile-time constants, so a failure is a development error caught by
/// the tests below.
#[must_use]
pub fn all_profiles() -> Vec<PipelineConfig> {
    PROFILE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            PipelineConfig::from_toml_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse profile '{name}': {e}"))
        })
        .collect()
}

/// Looks up a profile by name.
#[must_use]
pub fn by_name(name: &str) -> Option<PipelineConfig> {
    all_profiles().into_iter().find(|p| p.name == name)
}

/// Names of all registered profiles, in registry order.
#[must_use]
pub fn profile_names() -> Vec<&'static str> {
    PROFILE_TOMLS.iter().map(|(name, _)| *name).collect()
}
