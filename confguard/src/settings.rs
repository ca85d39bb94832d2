//! Runtime settings. Everything is env-driven with literal defaults so the
//! pipeline stays deterministic in tests.

use std::time::Duration;

/// Default cap on the number of findings returned per analysis.
pub const DEFAULT_FINDINGS_LIMIT: usize = 8;
/// Hard ceiling on the findings cap, whatever the configuration says.
pub const MAX_FINDINGS_LIMIT: usize = 50;
/// Default pinned Node base-image version for the normalization pass.
pub const DEFAULT_NODE_BASE_VERSION: &str = "22.0.0";
/// Default per-call timeout for the generative backend.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 45;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Findings cap, clamped to `1..=MAX_FINDINGS_LIMIT` at use sites.
    pub findings_limit: usize,
    /// Version substituted into `FROM node:*` lines by the autofix pass.
    pub node_base_version: String,
    /// Timeout applied to every generative backend call.
    pub llm_timeout: Duration,
    /// API key for the hosted backend, if configured.
    pub api_key: Option<String>,
    /// Model name for the hosted backend.
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            findings_limit: DEFAULT_FINDINGS_LIMIT,
            node_base_version: DEFAULT_NODE_BASE_VERSION.to_owned(),
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            api_key: None,
            model: "gemini-2.5-pro".to_owned(),
        }
    }
}

impl Settings {
    /// Builds settings from the environment, falling back to defaults for
    /// anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let findings_limit = std::env::var("CONFGUARD_FINDINGS_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.findings_limit);
        let node_base_version = std::env::var("CONFGUARD_NODE_BASE_VERSION")
            .unwrap_or(defaults.node_base_version);
        let llm_timeout = std::env::var("CONFGUARD_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.llm_timeout, Duration::from_secs);
        let api_key = std::env::var("GEMINI_API_KEY").ok();
        let model = std::env::var("GEMINI_MODEL").unwrap_or(defaults.model);

        Self {
            findings_limit,
            node_base_version,
            llm_timeout,
            api_key,
            model,
        }
    }
}
