//! Configuration loading and validation for planforge.
//!
//! Loads `planforge.toml` with environment variable overrides
//! (`PLANFORGE_*`). Validates all settings before they reach the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use planforge_core::PlanKind;
use planforge_planner::{MissingFunctionRetryOptions, PlannerOptions};

/// The root configuration structure. Maps directly to `planforge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token budget for the acquired-information block injected into a turn
    #[serde(default = "default_token_limit")]
    pub default_token_limit: usize,

    /// Planner behavior
    #[serde(default)]
    pub planner: PlannerConfig,
}

fn default_token_limit() -> usize {
    1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_token_limit: default_token_limit(),
            planner: PlannerConfig::default(),
        }
    }
}

/// Planner section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Which kind of plan to request ("action" or "sequential")
    #[serde(default = "default_kind")]
    pub kind: PlanKind,

    /// Whether an invalid-plan error may be retried (at most once per call)
    #[serde(default = "default_true")]
    pub allow_retries_on_invalid_plan: bool,

    /// Missing-function retry settings
    #[serde(default)]
    pub missing_function: MissingFunctionConfig,
}

fn default_kind() -> PlanKind {
    PlanKind::Action
}
fn default_true() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            allow_retries_on_invalid_plan: true,
            missing_function: MissingFunctionConfig::default(),
        }
    }
}

/// Missing-function retry section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingFunctionConfig {
    #[serde(default = "default_true")]
    pub allow_retries: bool,

    #[serde(default = "default_max_retries")]
    pub max_retries_allowed: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for MissingFunctionConfig {
    fn default() -> Self {
        Self {
            allow_retries: true,
            max_retries_allowed: default_max_retries(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from a TOML file, apply environment overrides,
    /// and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(token_limit = config.default_token_limit, "Loaded configuration");
        Ok(config)
    }

    /// Load from the given path if it exists, otherwise fall back to
    /// defaults (still applying environment overrides and validation).
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// Apply `PLANFORGE_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("PLANFORGE_TOKEN_LIMIT") {
            match value.parse() {
                Ok(limit) => self.default_token_limit = limit,
                Err(_) => warn!(%value, "Ignoring unparseable PLANFORGE_TOKEN_LIMIT"),
            }
        }
        if let Ok(value) = std::env::var("PLANFORGE_PLAN_KIND") {
            match value.to_ascii_lowercase().as_str() {
                "action" => self.planner.kind = PlanKind::Action,
                "sequential" => self.planner.kind = PlanKind::Sequential,
                _ => warn!(%value, "Ignoring unknown PLANFORGE_PLAN_KIND"),
            }
        }
        if let Ok(value) = std::env::var("PLANFORGE_MISSING_FUNCTION_RETRIES") {
            match value.parse() {
                Ok(max) => self.planner.missing_function.max_retries_allowed = max,
                Err(_) => warn!(%value, "Ignoring unparseable PLANFORGE_MISSING_FUNCTION_RETRIES"),
            }
        }
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_token_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "default_token_limit must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Convert into the per-request planner options the engine consumes.
    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            kind: self.planner.kind,
            allow_retries_on_invalid_plan: self.planner.allow_retries_on_invalid_plan,
            missing_function: MissingFunctionRetryOptions {
                allow_retries: self.planner.missing_function.allow_retries,
                max_retries_allowed: self.planner.missing_function.max_retries_allowed,
            },
        }
    }
}
