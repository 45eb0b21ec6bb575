//! Configuration management for antigravity
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `ANTIGRAVITY_OUTPUT_DIR`: Where projects are written - default: "./generated"
//! - `ANTIGRAVITY_PROFILES_DIR`: Saved stack profiles - default: "~/.antigravity/profiles"
//! - `ANTIGRAVITY_LOG_LEVEL`: Logging level - default: "info"
//! - `ANTIGRAVITY_ARCHIVE`: Also write a `.tar.gz` of each project (true|false) - default: "false"
//! - `ANTIGRAVITY_NETWORK`: docker-compose network shared by all services - default: "antigravity_net"
//!
//! # Example
//!
//! ```no_run
//! use antigravity::GeneratorConfig;
//!
//! let config = GeneratorConfig::from_env().expect("Invalid environment");
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use regex::Regex;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Default values for configuration
pub const DEFAULT_OUTPUT_DIR: &str = "./generated";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_ARCHIVE: bool = false;
pub const DEFAULT_NETWORK: &str = "antigravity_net";

const PROJECT_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_-]*$";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Invalid project name '{0}': must start with a letter and contain only letters, digits, '_' or '-'")]
    InvalidProjectName(String),
}

/// Main configuration structure for antigravity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory generated projects are written under
    pub output_dir: PathBuf,

    /// Directory holding user-saved stack profiles
    pub profiles_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Write a gzipped tarball next to the project directory
    pub archive: bool,

    /// Compose network every service joins
    pub network: String,
}

fn default_profiles_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(env::temp_dir)
        .join(".antigravity")
        .join("profiles")
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::ParseError {
            field: field.to_string(),
            error: format!("expected a boolean, got '{}'", other),
        }),
    }
}

impl Default for GeneratorConfig {
    /// Loads from `ANTIGRAVITY_*` variables, ignoring values that fail to parse.
    fn default() -> Self {
        let archive = env::var("ANTIGRAVITY_ARCHIVE")
            .ok()
            .and_then(|v| parse_bool("ANTIGRAVITY_ARCHIVE", &v).ok())
            .unwrap_or(DEFAULT_ARCHIVE);
        Self::base(archive)
    }
}

impl GeneratorConfig {
    fn base(archive: bool) -> Self {
        let output_dir = env::var("ANTIGRAVITY_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let profiles_dir = env::var("ANTIGRAVITY_PROFILES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_profiles_dir());

        let log_level = env::var("ANTIGRAVITY_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let network = env::var("ANTIGRAVITY_NETWORK").unwrap_or_else(|_| DEFAULT_NETWORK.to_string());

        Self {
            output_dir,
            profiles_dir,
            log_level,
            archive,
            network,
        }
    }

    /// Like `default()`, but a malformed value is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let archive = match env::var("ANTIGRAVITY_ARCHIVE") {
            Ok(v) => parse_bool("ANTIGRAVITY_ARCHIVE", &v)?,
            Err(_) => DEFAULT_ARCHIVE,
        };
        Ok(Self::base(archive))
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` for an empty network name or
    /// an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Network name cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Directory a project named `project_name` is written to.
    pub fn project_dir(&self, project_name: &str) -> PathBuf {
        self.output_dir.join(project_name)
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Antigravity Configuration:")?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        writeln!(f, "  Profiles Dir: {}", self.profiles_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Archive: {}", self.archive)?;
        writeln!(f, "  Network: {}", self.network)?;
        Ok(())
    }
}

fn project_name_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PROJECT_NAME_PATTERN).unwrap_or_else(|_| unreachable!()))
}

/// Project names become directory, database and compose names.
pub fn validate_project_name(name: &str) -> Result<(), ConfigError> {
    if project_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProjectName(name.to_string()))
    }
}
