//! Panel-wide tuning knobs.
//!
//! Resolution order used by the CLI: defaults, then an optional TOML file,
//! then `LESSONPANEL_*` environment variables, then explicit flags.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Result;
use crate::evaluator::{SemanticChecks, DEFAULT_PROBE_TIMEOUT};
use crate::orchestration::ParallelEvalConfig;
use crate::synthesis::{
    SynthesisConfig, DEFAULT_AGREEMENT_THRESHOLD, DEFAULT_CATEGORY_ORDER, DEFAULT_KEY_PREFIX_LEN,
};

pub const ENV_AGREEMENT_THRESHOLD: &str = "LESSONPANEL_AGREEMENT_THRESHOLD";
pub const ENV_KEY_PREFIX_LEN: &str = "LESSONPANEL_KEY_PREFIX_LEN";
pub const ENV_CATEGORY_ORDER: &str = "LESSONPANEL_CATEGORY_ORDER";
pub const ENV_MAX_CONCURRENT: &str = "LESSONPANEL_MAX_CONCURRENT";
pub const ENV_PROBE_TIMEOUT_MS: &str = "LESSONPANEL_PROBE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub agreement_threshold: usize,
    pub key_prefix_len: usize,
    pub category_order: Vec<String>,
    pub max_concurrent: usize,
    pub probe_timeout_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            agreement_threshold: DEFAULT_AGREEMENT_THRESHOLD,
            key_prefix_len: DEFAULT_KEY_PREFIX_LEN,
            category_order: DEFAULT_CATEGORY_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_concurrent: 4,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl PanelConfig {
    /// Defaults overlaid with any `LESSONPANEL_*` variables that are set.
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    /// Read a TOML file; keys it omits keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Replace fields whose environment variable is set and parses.
    pub fn overlay_env(self) -> Self {
        self.overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = parse_var(&lookup, ENV_AGREEMENT_THRESHOLD) {
            self.agreement_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_KEY_PREFIX_LEN) {
            self.key_prefix_len = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_CONCURRENT) {
            self.max_concurrent = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_PROBE_TIMEOUT_MS) {
            self.probe_timeout_ms = v;
        }
        if let Some(order) = lookup(ENV_CATEGORY_ORDER) {
            self.category_order = order
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        self
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            agreement_threshold: self.agreement_threshold.max(1),
            key_prefix_len: self.key_prefix_len,
            category_order: self.category_order.clone(),
        }
    }

    pub fn parallel_config(&self) -> ParallelEvalConfig {
        ParallelEvalConfig {
            max_concurrent: self.max_concurrent.max(1),
            checks: SemanticChecks::new(self.probe_timeout()),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_synthesis_defaults() {
        let cfg = PanelConfig::default();
        assert_eq!(cfg.synthesis_config(), SynthesisConfig::default());
        assert_eq!(cfg.parallel_config().max_concurrent, 4);
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_AGREEMENT_THRESHOLD, "2"),
            (ENV_MAX_CONCURRENT, "not-a-number"),
            (ENV_CATEGORY_ORDER, "enrichment, engagement"),
        ]);
        let cfg = PanelConfig::default().overlay(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.agreement_threshold, 2);
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.category_order, vec!["enrichment", "engagement"]);
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let cfg = PanelConfig {
            agreement_threshold: 0,
            max_concurrent: 0,
            ..PanelConfig::default()
        };
        assert_eq!(cfg.synthesis_config().agreement_threshold, 1);
        assert_eq!(cfg.parallel_config().max_concurrent, 1);
    }

    #[test]
    fn test_from_toml_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.toml");
        std::fs::write(&path, "agreement_threshold = 2\nprobe_timeout_ms = 250\n").unwrap();

        let cfg = PanelConfig::from_toml_file(&path).unwrap();
        assert_eq!(cfg.agreement_threshold, 2);
        assert_eq!(cfg.probe_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.key_prefix_len, DEFAULT_KEY_PREFIX_LEN);
    }
}
