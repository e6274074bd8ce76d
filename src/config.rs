//! Application configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or FSMVIEW_CONFIG)
//! 3. Environment variables

use fsmview_core::{ModelBuilder, TransitionInjectionRule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Interactive session configuration.
    pub repl: ReplConfig,
    /// Model file lookup.
    pub models: ModelsConfig,
    /// Post-build rules applied to every loaded model.
    pub rules: RulesConfig,
}

impl Config {
    /// Loads configuration from an optional file, then applies environment
    /// variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(filter) = var("FSMVIEW_LOG") {
            self.logging.filter = filter;
        }
        if let Some(path) = var("FSMVIEW_HISTORY") {
            self.repl.history_file = Some(PathBuf::from(path));
        }
        if let Some(no_color) = var("FSMVIEW_NO_COLOR") {
            if no_color == "1" || no_color.eq_ignore_ascii_case("true") {
                self.repl.color = false;
            }
        }
        if let Some(dirs) = var("FSMVIEW_MODEL_DIRS") {
            self.models.search_dirs = std::env::split_paths(&dirs).collect();
        }
    }

    /// Validates rule configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, rule) in self.rules.inject.iter().enumerate() {
            if rule.compound.trim().is_empty() || rule.trigger.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules.inject[{}] needs both 'compound' and 'trigger'",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Creates a model builder with the configured rules registered.
    pub fn builder(&self) -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        for rule in &self.rules.inject {
            builder.with_rule(TransitionInjectionRule::new(&rule.compound, &rule.trigger));
        }
        builder
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when RUST_LOG is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

/// Interactive session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Line history file. Defaults to `~/.fsmview_history`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,
    /// Colored output.
    pub color: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            color: true,
        }
    }
}

impl ReplConfig {
    /// Returns the history file path.
    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            home::home_dir()
                .map(|h| h.join(".fsmview_history"))
                .unwrap_or_else(|| PathBuf::from(".fsmview_history"))
        })
    }
}

/// Model file lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directories searched when a model path does not exist as given.
    pub search_dirs: Vec<PathBuf>,
}

/// Post-build rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Transition injection rules, applied in order.
    pub inject: Vec<InjectRuleConfig>,
}

/// Copies the initial state's `trigger` transitions onto `compound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectRuleConfig {
    pub compound: String,
    pub trigger: String,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
