use crate::coordinator::DEFAULT_LOCK_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const LOCK_TIMEOUT_VAR: &str = "TRIAD_LOCK_TIMEOUT_MS";
pub const DEAL_SEED_VAR: &str = "TRIAD_DEAL_SEED";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be an unsigned integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Engine settings.
///
/// ```
/// use std::time::Duration;
/// use triad_rs::config::EngineConfig;
///
/// let cfg = EngineConfig::default().with_deal_seed(7);
/// assert_eq!(cfg.lock_timeout(), Duration::from_secs(5));
/// assert_eq!(cfg.deal_seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest wait for a match's exclusive section, in milliseconds
    pub lock_timeout_ms: u64,
    /// Fixed seed for dealing; `None` seeds from the OS
    pub deal_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: u64::try_from(DEFAULT_LOCK_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            deal_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_deal_seed(mut self, seed: u64) -> Self {
        self.deal_seed = Some(seed);
        self
    }

    /// Defaults overridden by `TRIAD_LOCK_TIMEOUT_MS` and `TRIAD_DEAL_SEED`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(ms) = parse_var(&lookup, LOCK_TIMEOUT_VAR)? {
            cfg.lock_timeout_ms = ms;
        }
        if let Some(seed) = parse_var(&lookup, DEAL_SEED_VAR)? {
            cfg.deal_seed = Some(seed);
        }
        Ok(cfg)
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(EngineConfig::from_lookup(env(&[])).unwrap(), EngineConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let vars = env(&[(LOCK_TIMEOUT_VAR, "250"), (DEAL_SEED_VAR, " 9 ")]);
        let cfg = EngineConfig::from_lookup(vars).unwrap();
        assert_eq!(cfg.lock_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.deal_seed, Some(9));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = EngineConfig::from_lookup(env(&[(DEAL_SEED_VAR, "soon")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: DEAL_SEED_VAR, value: "soon".into() });
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"deal_seed": 3}"#).unwrap();
        assert_eq!(cfg.lock_timeout_ms, 5000);
        assert_eq!(cfg.deal_seed, Some(3));
    }
}
