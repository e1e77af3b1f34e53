// src/config/validate.rs

use crate::config::{RawRuntimeConfig, RuntimeConfig};
use crate::errors::{Error, Result};

impl TryFrom<RawRuntimeConfig> for RuntimeConfig {
    type Error = Error;

    fn try_from(raw: RawRuntimeConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(RuntimeConfig::new_unchecked(raw.runtime, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawRuntimeConfig) -> Result<()> {
    validate_depth_limit(cfg)?;
    validate_log_level(cfg)?;
    Ok(())
}

fn validate_depth_limit(cfg: &RawRuntimeConfig) -> Result<()> {
    if let Some(depth) = cfg.runtime.max_tree_depth {
        if depth == 0 {
            return Err(Error::Config(
                "[runtime].max_tree_depth must be >= 1 (got 0)".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_log_level(cfg: &RawRuntimeConfig) -> Result<()> {
    if let Some(level) = cfg.logging.level.as_deref() {
        if crate::logging::parse_level_str(level).is_none() {
            return Err(Error::Config(format!(
                "[logging].level must be one of error/warn/info/debug/trace (got {level:?})"
            )));
        }
    }
    Ok(())
}
