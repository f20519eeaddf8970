//! eplusout configuration
//!
//! Settings come from a TOML file (`eplusout.toml` or the user config dir)
//! and `EPLUSOUT_*` environment variables, which win over the file.

use crate::eso::ParseOptions;
use crate::query::ExportOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Reader, export and logging settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output file reading
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReaderConfig {
    /// Calendar year of the first step; inferred from the file when absent
    #[serde(default)]
    pub year: Option<i32>,
}

impl ReaderConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { year: self.year }
    }
}

/// Delimited-text export
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default)]
    pub explode_header: bool,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            explode_header: false,
        }
    }
}

impl ExportConfig {
    /// Export options for this config; the delimiter must be one ASCII character
    pub fn export_options(&self) -> Result<ExportOptions, ConfigError> {
        let delimiter = match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => *byte,
            _ => {
                return Err(ConfigError::Invalid {
                    field: "export.delimiter".to_string(),
                    error: format!("expected one ASCII character, got {:?}", self.delimiter),
                })
            }
        };
        Ok(ExportOptions::new()
            .with_delimiter(delimiter)
            .with_exploded_header(self.explode_header))
    }
}

/// Log output of the binary
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Read a TOML file; absent sections and keys take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Defaults plus environment overrides, without any file
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Read a TOML file, then apply environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            Some(PathBuf::from("./eplusout.toml")),
            dirs::config_dir().map(|p| p.join("eplusout").join("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// First readable file of `default_paths()`, or `from_env()`
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `EPLUSOUT_*` overrides looked up through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Reader overrides
        if let Some(year) = lookup("EPLUSOUT_YEAR") {
            match year.parse() {
                Ok(y) => self.reader.year = Some(y),
                Err(_) => tracing::warn!("Ignoring invalid EPLUSOUT_YEAR {:?}", year),
            }
        }

        // Export overrides
        if let Some(delimiter) = lookup("EPLUSOUT_CSV_DELIMITER") {
            self.export.delimiter = delimiter;
        }

        // Logging overrides
        if let Some(level) = lookup("EPLUSOUT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("EPLUSOUT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Errors reading or validating a config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {field}: {error}")]
    Invalid { field: String, error: String },
}

/// Commented config file holding every default
pub fn generate_default_config() -> String {
    r#"# eplusout Configuration
#
# Environment variables override these settings:
# - EPLUSOUT_YEAR
# - EPLUSOUT_CSV_DELIMITER
# - EPLUSOUT_LOG_LEVEL
# - EPLUSOUT_LOG_FORMAT

[reader]
# Calendar year of the first reported step. When unset, the year is
# inferred from the first weekday in the file (falling back to 2002).
# year = 2002

[export]
# Cell delimiter of exported files (one character)
delimiter = ","

# Write key, type and units as three header rows
explode_header = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for terminals) or json (for log collectors)
format = "pretty"
"#
    .to_string()
}
