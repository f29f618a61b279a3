//! Configuration loading.
//!
//! A single TOML file declares the built-in checks, the route tree and
//! logging. Path: `--config`, else `$GUARDCHAIN_CONFIG`, else
//! `./guardchain.toml`.
//!
//! Precedence: env vars > config file > defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::check::builtin::CheckDefinition;
use crate::check::CheckId;
use crate::guard::InvocationKind;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "GUARDCHAIN_CONFIG";

/// Config file used when nothing else is specified.
pub const DEFAULT_CONFIG_FILE: &str = "guardchain.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,

    /// Built-in check definitions keyed by identifier.
    pub checks: BTreeMap<CheckId, CheckDefinition>,

    /// Route tree roots.
    pub routes: Vec<RouteDefinition>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated JSON logs. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// One node of the route tree as declared in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteDefinition {
    /// Path pattern relative to the parent (`""`, `users`, `:id`, `**`).
    #[serde(default)]
    pub path: String,

    /// Check identifiers guarding this node, in order.
    #[serde(default)]
    pub checks: Option<Vec<CheckId>>,

    /// `"AND"` (default) or `"OR"`.
    #[serde(default)]
    pub guards_relation: Option<String>,

    /// Kinds for which the chain evaluator is registered on this node.
    #[serde(default)]
    pub chain_on: Vec<InvocationKind>,

    /// Free-form route data.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,

    /// Child routes.
    #[serde(default)]
    pub children: Vec<RouteDefinition>,
}

impl Config {
    /// Load configuration from `explicit` or the default location, then
    /// apply environment overrides.
    ///
    /// A missing file yields defaults unless the path was given explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match env(CONFIG_PATH_ENV) {
                Some(p) => (PathBuf::from(p), true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Self::default(),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read config at {}: {e}",
                    path.display()
                ))
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid config TOML")
    }

    /// Apply environment variable overrides.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(level) = env("GUARDCHAIN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = env("GUARDCHAIN_LOG_DIR") {
            self.logging.dir = if dir.is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
    }
}
