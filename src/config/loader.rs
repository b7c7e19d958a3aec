//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate. Sources are layered,
//! later ones winning:
//!
//! 1. built-in defaults ([`ScoringConfig::default`])
//! 2. `<dir>/tierhealth.yaml`
//! 3. `<dir>/environments/<env>.yaml`
//! 4. environment variables such as `TIERHEALTH__HISTORY__CAPACITY=50`

use super::error::{ConfigResult, ConfigurationError};
use super::ScoringConfig;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE: &str = "tierhealth.yaml";
const ENV_PREFIX: &str = "TIERHEALTH";
const ENV_SEPARATOR: &str = "__";

/// Loaded and validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ScoringConfig,
    environment: String,
    config_directory: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Process environment variables still apply as the final layer.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, None)
    }

    /// Like [`Self::load_from_directory_with_env`] but reads overrides from `vars` instead of
    /// the process environment. Keys use the same `TIERHEALTH__SECTION__FIELD` shape.
    pub fn load_with_env_vars(
        config_dir: Option<PathBuf>,
        environment: &str,
        vars: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(config_dir, environment, Some(vars))
    }

    /// Wrap an already built configuration after validating it
    pub fn from_config(config: ScoringConfig, environment: &str) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: None,
        })
    }

    fn load_with_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = match config_dir {
            Some(dir) if !dir.is_dir() => {
                return Err(ConfigurationError::DirectoryNotFound { path: dir })
            }
            Some(dir) => Some(dir),
            None => Self::default_config_directory(),
        };

        debug!(
            environment = %environment,
            config_directory = ?config_directory,
            "Loading scoring configuration"
        );

        let config = Self::load_and_merge_config(config_directory.as_deref(), environment, vars)?;
        config.validate()?;

        let manager = ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        };

        info!(
            environment = %manager.environment,
            history_capacity = manager.config.history.capacity,
            "⚙️ Scoring configuration loaded"
        );
        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&manager.debug_config())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(Arc::new(manager))
    }

    fn load_and_merge_config(
        config_directory: Option<&Path>,
        environment: &str,
        vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<ScoringConfig> {
        // Built-in defaults come from serde, so sources only carry overrides
        let mut builder = Config::builder();

        if let Some(dir) = config_directory {
            let base = dir.join(BASE_FILE);
            let overlay = dir.join("environments").join(format!("{environment}.yaml"));
            debug!(base = %base.display(), overlay = %overlay.display(), "Configuration file sources");
            builder = builder
                .add_source(File::from(base).required(false))
                .add_source(File::from(overlay).required(false));
        }

        let env_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(vars);
        builder = builder.add_source(env_source);

        builder
            .build()
            .map_err(|e| ConfigurationError::source_error("configuration sources", e))?
            .try_deserialize::<ScoringConfig>()
            .map_err(ConfigurationError::deserialization_error)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> Option<&Path> {
        self.config_directory.as_deref()
    }

    /// JSON view of the effective configuration for logs and diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.environment,
            "config_directory": self.config_directory.as_ref().map(|d| d.display().to_string()),
            "config": serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null),
        })
    }

    /// Detect current environment from `TIERHEALTH_ENV` or `APP_ENV`
    pub fn detect_environment() -> String {
        env::var("TIERHEALTH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// `TIERHEALTH_CONFIG_DIR`, else `./config` when it exists
    fn default_config_directory() -> Option<PathBuf> {
        if let Ok(dir) = env::var("TIERHEALTH_CONFIG_DIR") {
            return Some(PathBuf::from(dir));
        }
        let local = PathBuf::from("config");
        local.join(BASE_FILE).exists().then_some(local)
    }
}
