//! Configuration system for the diffeq host.
//!
//! Load host configuration from TOML or YAML to point the host at a compile
//! service, size the sandbox's captured streams, and set the default solver
//! options without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use diffeq_config::HostConfig;
//! use diffeq_core::LinearSolver;
//! use std::time::Duration;
//!
//! let config = HostConfig::from_toml_str(r#"
//!     [compiler]
//!     base_url = "http://localhost:8080/diffeq"
//!     timeout_secs = 30
//!
//!     [sandbox]
//!     stderr_capacity = 65536
//!
//!     [options]
//!     linear_solver = "klu"
//!     mxsteps = 1000
//! "#).unwrap();
//!
//! assert_eq!(config.compiler.compile_url(), "http://localhost:8080/diffeq/compile");
//! assert_eq!(config.compiler.timeout(), Some(Duration::from_secs(30)));
//! assert_eq!(config.options.linear_solver, LinearSolver::Klu);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use diffeq_config::HostConfig;
//!
//! let config = HostConfig::load("diffeq.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;
use std::time::Duration;

use diffeq_core::OptionsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default compile service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://compbio.fhs.um.edu.mo/diffeq";

/// Model name sent with every compile request.
pub const DEFAULT_MODEL_NAME: &str = "unknown";

/// Default capacity in bytes of each captured output stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 1 << 20;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for diffeq_core::DiffeqError {
    fn from(err: ConfigError) -> Self {
        diffeq_core::DiffeqError::Config(err.to_string())
    }
}

/// Main host configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HostConfig {
    /// Remote compile service settings.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Sandbox settings applied to every instantiated module.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Default solver options.
    #[serde(default)]
    pub options: OptionsConfig,
}

impl HostConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML, or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("compiler.base_url is empty".into()));
        }
        if self.sandbox.stdout_capacity == 0 || self.sandbox.stderr_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sandbox stream capacities must be non-zero".into(),
            ));
        }
        if self.options.min_step > self.options.max_step {
            return Err(ConfigError::Invalid(format!(
                "options.min_step ({}) exceeds options.max_step ({})",
                self.options.min_step, self.options.max_step
            )));
        }
        Ok(())
    }

    /// Sets the compile service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.compiler.base_url = base_url.into();
        self
    }

    /// Sets the default solver options.
    pub fn with_options(mut self, options: OptionsConfig) -> Self {
        self.options = options;
        self
    }

    /// Rejects modules that miss any required export at load time.
    pub fn with_complete_capabilities(mut self, required: bool) -> Self {
        self.sandbox.require_complete_capabilities = required;
        self
    }
}

/// Remote compile service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CompilerConfig {
    /// Base URL; requests go to `<base_url>/compile`.
    pub base_url: String,

    /// Value of the `name` field in compile requests.
    pub model_name: String,

    /// Request timeout in seconds. No timeout when absent.
    pub timeout_secs: Option<u64>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            timeout_secs: None,
        }
    }
}

impl CompilerConfig {
    /// Returns the full compile endpoint.
    pub fn compile_url(&self) -> String {
        format!("{}/compile", self.base_url.trim_end_matches('/'))
    }

    /// Returns the request timeout as a Duration, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Sandbox configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Capacity in bytes of the captured stdout buffer.
    pub stdout_capacity: usize,

    /// Capacity in bytes of the captured stderr buffer.
    pub stderr_capacity: usize,

    /// Fail the load when a required export is missing, instead of failing
    /// on first use of that operation.
    pub require_complete_capabilities: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            stdout_capacity: DEFAULT_STREAM_CAPACITY,
            stderr_capacity: DEFAULT_STREAM_CAPACITY,
            require_complete_capabilities: false,
        }
    }
}

#[cfg(test)]
mod tests;
