use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Operator-tunable numeric ranges and service keys, loaded from
/// `config.json` (path overridable via `GALILEO_CONFIG_PATH`).
///
/// All `[min, max]` ranges are inclusive; seconds for pauses and retry
/// delays, percent of balance for swap sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub max_attempts: usize,
    pub retry_delay_secs: [u64; 2],
    pub pause_between_swaps_secs: [u64; 2],
    pub pause_between_accounts_secs: [u64; 2],
    pub number_of_swaps: [u32; 2],
    pub swap_percent: [u32; 2],
    pub captcha_api_key: String,
}

fn check_range_u64(name: &str, range: [u64; 2]) -> Result<()> {
    if range[0] > range[1] {
        return Err(ConfigError::Invalid(format!(
            "{name} range is inverted: [{}, {}]",
            range[0], range[1]
        ))
        .into());
    }
    Ok(())
}

fn check_range_u32(name: &str, range: [u32; 2]) -> Result<()> {
    check_range_u64(name, [u64::from(range[0]), u64::from(range[1])])
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = std::env::var("GALILEO_CONFIG_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::Missing(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)
            .map_err(|err| ConfigError::Invalid(format!("config.json: {err}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be >= 1".to_string()).into());
        }
        check_range_u64("retry_delay_secs", self.retry_delay_secs)?;
        check_range_u64("pause_between_swaps_secs", self.pause_between_swaps_secs)?;
        check_range_u64("pause_between_accounts_secs", self.pause_between_accounts_secs)?;
        check_range_u32("number_of_swaps", self.number_of_swaps)?;
        check_range_u32("swap_percent", self.swap_percent)?;
        if self.swap_percent[0] == 0 || self.swap_percent[1] > 100 {
            return Err(ConfigError::Invalid(format!(
                "swap_percent must lie within [1, 100], got [{}, {}]",
                self.swap_percent[0], self.swap_percent[1]
            ))
            .into());
        }
        if self.captcha_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("captcha_api_key must be set".to_string()).into());
        }
        Ok(())
    }
}
