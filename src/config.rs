//! Engine-wide configuration: tunables that sit outside VCL semantics
//! proper (the restart budget, an optional goto hop limit, default
//! scalar surfaces) and are legitimately overridable per deployment.
//!
//! Loaded the way `ConfigLoader` loads YAML in the sibling DSL crate
//! this engine is descended from, minus its verb/CSG schema: a single
//! flat document, with an env-var override and a built-in fallback so
//! the engine runs with zero external files by default.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::context::ClientInfo;

pub const DEFAULT_MAX_RESTARTS: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Non-configurable by the VCL language itself (§3.6, §9), but an
    /// implementer-facing override for hardened deployments; defaults
    /// to the spec's MAX_RESTARTS = 4.
    pub max_restarts: u32,
    /// Hop limit against adversarial goto cycles (§5: "an implementer
    /// MAY impose a hop limit"). `None` disables the limit, matching
    /// the spec's default (unbounded, since label targets are static
    /// and finite in practice).
    pub max_goto_hops: Option<u32>,
    pub default_country_code: String,
    pub default_continent_code: String,
    pub default_latitude: f64,
    pub default_longitude: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
            max_goto_hops: None,
            default_country_code: "US".to_string(),
            default_continent_code: "NA".to_string(),
            default_latitude: 37.7749,
            default_longitude: -122.4194,
        }
    }
}

impl EngineConfig {
    /// Load from `VCL_ENGINE_CONFIG` if set, else fall back to
    /// built-in defaults. Never fails: a missing or malformed override
    /// path logs a warning and returns defaults, since an interpreter
    /// must never fail to start for lack of an optional file.
    pub fn from_env() -> Self {
        match std::env::var("VCL_ENGINE_CONFIG") {
            Ok(path) => match Self::load(Path::new(&path)) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to load engine config from {path}: {err:#}; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn client_defaults(&self) -> ClientInfo {
        ClientInfo {
            country_code: self.default_country_code.clone(),
            continent_code: self.default_continent_code.clone(),
            latitude: self.default_latitude,
            longitude: self.default_longitude,
            ..ClientInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.max_restarts, 4);
        assert!(config.max_goto_hops.is_none());
    }

    #[test]
    fn from_env_falls_back_without_override() {
        std::env::remove_var("VCL_ENGINE_CONFIG");
        let config = EngineConfig::from_env();
        assert_eq!(config.max_restarts, DEFAULT_MAX_RESTARTS);
    }
}
