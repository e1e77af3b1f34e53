// src/config/mod.rs

//! Runtime configuration for embedders of the job tree.
//!
//! Configuration is optional: `Scope::builder()` works without it, but
//! applications that want file-driven settings load a small TOML document:
//!
//! ```toml
//! [runtime]
//! default_supervision = "propagating"   # or "isolating"
//! max_tree_depth = 64                   # optional spawn-depth guard
//!
//! [logging]
//! level = "info"
//! ```
//!
//! [`loader`] handles deserialization, [`validate`] the semantic checks;
//! the rest of the crate only ever sees a validated [`RuntimeConfig`].

pub mod loader;
pub mod validate;

use serde::Deserialize;

use crate::types::SupervisionMode;

/// `[runtime]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Supervision mode new root scopes default to.
    #[serde(default)]
    pub default_supervision: SupervisionMode,

    /// Optional upper bound on tree depth; spawning below it fails with
    /// `Error::DepthLimit`. `None` means unbounded.
    #[serde(default)]
    pub max_tree_depth: Option<usize>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Log level name ("error" | "warn" | "info" | "debug" | "trace").
    #[serde(default)]
    pub level: Option<String>,
}

/// Raw, unvalidated configuration as deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuntimeConfig {
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration.
///
/// Constructed only through `TryFrom<RawRuntimeConfig>` (see
/// [`validate`]), so holders can rely on the invariants checked there.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub runtime: RuntimeSection,
    pub logging: LoggingSection,
}

impl RuntimeConfig {
    pub(crate) fn new_unchecked(runtime: RuntimeSection, logging: LoggingSection) -> Self {
        Self { runtime, logging }
    }

    pub fn default_supervision(&self) -> SupervisionMode {
        self.runtime.default_supervision
    }

    pub fn max_tree_depth(&self) -> Option<usize> {
        self.runtime.max_tree_depth
    }

    /// Parsed log level, if one was configured.
    pub fn log_level(&self) -> Option<tracing::Level> {
        self.logging
            .level
            .as_deref()
            .and_then(crate::logging::parse_level_str)
    }
}

pub use loader::{load_and_validate, load_from_path};
