// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deployment configuration for the protocol runtime.
//!
//! [`RuntimeConfig`] carries the settings that don't belong to any one
//! episode: default budgets, freshness-window overrides for INV-004,
//! the per-episode step ceiling, default log level, and where episode
//! logs are written. Loading is TOML first, environment second;
//! [`validate_config`] reports soft [`ConfigWarning`]s and reserves
//! [`ConfigError::Validation`] for values that cannot be reconciled at
//! all.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;

use apr_error::{AprError, ErrorCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    Parse {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    Validation {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl From<ConfigError> for AprError {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        AprError::new(ErrorCode::ConfigInvalid, message).with_source(err)
    }
}

/// Advisory-level issues that don't prevent the runtime from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The operational freshness window is not wider than the realtime one.
    NarrowOperationalWindow {
        /// Configured realtime window, in seconds.
        realtime_seconds: i64,
        /// Configured operational window, in seconds.
        operational_seconds: i64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::NarrowOperationalWindow { realtime_seconds, operational_seconds } => {
                write!(f, "operational freshness window ({operational_seconds}s) is not wider than the realtime window ({realtime_seconds}s)")
            }
        }
    }
}

/// Default resource ceilings bound into a compiled episode's budgets
/// unless a template or caller overrides them.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct DefaultBudgets {
    /// Default token budget.
    pub token_budget: u64,
    /// Default tool-call budget.
    pub tool_call_budget: u64,
    /// Default wall-clock time budget, in seconds.
    pub time_budget_seconds: u64,
    /// Default maximum acceptable loss under the active risk envelope.
    pub risk_max_loss: f64,
}

impl Default for DefaultBudgets {
    fn default() -> Self {
        Self { token_budget: 50_000, tool_call_budget: 50, time_budget_seconds: 600, risk_max_loss: 1.0 }
    }
}

/// Freshness window overrides for INV-004 (evidence grounding).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct FreshnessWindows {
    /// Maximum age, in seconds, for REALTIME-classified evidence.
    pub realtime_seconds: i64,
    /// Maximum age, in seconds, for OPERATIONAL-classified evidence.
    pub operational_seconds: i64,
}

impl Default for FreshnessWindows {
    fn default() -> Self {
        Self { realtime_seconds: 60, operational_seconds: 3600 }
    }
}

/// Top-level runtime configuration for the protocol runtime.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RuntimeConfig {
    /// Default log level (`RUST_LOG`-compatible directive), e.g. `"info"`.
    #[serde(default = "default_log_level")]
    pub default_log_level: String,
    /// Hard ceiling on steps a single episode may take before the runner
    /// forces an escalation.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    /// Directory episode JSONL logs are written to, if persistence is
    /// enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_log_dir: Option<String>,
    /// Default resource ceilings bound into compiled episodes.
    #[serde(default)]
    pub default_budgets: DefaultBudgets,
    /// Freshness window overrides for INV-004.
    #[serde(default)]
    pub freshness: FreshnessWindows,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_steps() -> u64 {
    500
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_log_level: default_log_level(),
            max_steps: default_max_steps(),
            episode_log_dir: None,
            default_budgets: DefaultBudgets::default(),
            freshness: FreshnessWindows::default(),
        }
    }
}

const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Load a [`RuntimeConfig`] from an optional TOML file, then apply
/// environment overrides. `path = None` starts from
/// [`RuntimeConfig::default`].
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound { path: p.display().to_string() })?;
            parse_toml(&content)?
        }
        None => RuntimeConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`RuntimeConfig`].
pub fn parse_toml(content: &str) -> Result<RuntimeConfig, ConfigError> {
    toml::from_str::<RuntimeConfig>(content).map_err(|e| ConfigError::Parse { reason: e.to_string() })
}

/// Apply environment variable overrides.
///
/// Recognised variables: `APR_DEFAULT_LOG_LEVEL`, `APR_MAX_STEPS`,
/// `APR_EPISODE_LOG_DIR`, `APR_FRESHNESS_REALTIME_SECS`,
/// `APR_FRESHNESS_OPERATIONAL_SECS`. Unparsable numeric overrides are
/// ignored rather than treated as fatal, since the file-level config (or
/// the built-in default) remains a valid fallback.
pub fn apply_env_overrides(config: &mut RuntimeConfig) {
    if let Ok(val) = std::env::var("APR_DEFAULT_LOG_LEVEL") {
        config.default_log_level = val;
    }
    if let Ok(val) = std::env::var("APR_MAX_STEPS") {
        if let Ok(parsed) = val.parse() {
            config.max_steps = parsed;
        }
    }
    if let Ok(val) = std::env::var("APR_EPISODE_LOG_DIR") {
        config.episode_log_dir = Some(val);
    }
    if let Ok(val) = std::env::var("APR_FRESHNESS_REALTIME_SECS") {
        if let Ok(parsed) = val.parse() {
            config.freshness.realtime_seconds = parsed;
        }
    }
    if let Ok(val) = std::env::var("APR_FRESHNESS_OPERATIONAL_SECS") {
        if let Ok(parsed) = val.parse() {
            config.freshness.operational_seconds = parsed;
        }
    }
}

/// Validate a loaded configuration, returning advisory warnings.
///
/// Hard errors (unrecognised log level, zero-or-negative ceilings) come
/// back as [`ConfigError::Validation`]; everything else is a warning.
pub fn validate_config(config: &RuntimeConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.default_log_level.as_str()) {
        errors.push(format!("invalid default_log_level '{}'", config.default_log_level));
    }
    if config.max_steps == 0 {
        errors.push("max_steps must be greater than zero".to_string());
    }
    if config.freshness.realtime_seconds <= 0 {
        errors.push("freshness.realtime_seconds must be positive".to_string());
    }
    if config.freshness.operational_seconds <= 0 {
        errors.push("freshness.operational_seconds must be positive".to_string());
    }
    if config.default_budgets.risk_max_loss < 0.0 {
        errors.push("default_budgets.risk_max_loss must not be negative".to_string());
    }

    if errors.is_empty() && config.freshness.operational_seconds < config.freshness.realtime_seconds {
        warnings.push(ConfigWarning::NarrowOperationalWindow {
            realtime_seconds: config.freshness.realtime_seconds,
            operational_seconds: config.freshness.operational_seconds,
        });
    }
    if config.episode_log_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "episode_log_dir".into(),
            hint: "episode logs will not be persisted to disk".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::Validation { reasons: errors })
    }
}

/// Merge two configurations; values set in `overlay` take precedence
/// over `base`.
#[must_use]
pub fn merge_configs(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
    RuntimeConfig {
        default_log_level: overlay.default_log_level,
        max_steps: overlay.max_steps,
        episode_log_dir: overlay.episode_log_dir.or(base.episode_log_dir),
        default_budgets: overlay.default_budgets,
        freshness: overlay.freshness,
    }
}
