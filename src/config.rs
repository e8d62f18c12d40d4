//! Configuration
//!
//! Loaded from a TOML file, then overridden by `SURVEY_DASH_*` environment
//! variables, then by command-line flags in `main`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::aggregate::{DEFAULT_MULTI_VALUE_DELIMITER, DEFAULT_TOP_N};
use crate::controller::ChartSettings;
use crate::csv_reader::LoadOptions;

pub const DEFAULT_CONFIG_FILE: &str = "survey_dash.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub charts: ChartsConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the settings came from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Overrides that were ignored. Loading runs before the log subscriber
    /// exists, so `main` reports these once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_multi_value_delimiter")]
    pub multi_value_delimiter: char,

    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,

    #[serde(default = "default_age_column")]
    pub age_column: String,

    #[serde(default = "default_country_column")]
    pub country_column: String,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/survey.csv")
}

fn default_delimiter() -> char {
    ','
}

fn default_multi_value_delimiter() -> char {
    DEFAULT_MULTI_VALUE_DELIMITER
}

fn default_null_values() -> Vec<String> {
    vec![String::new(), "NA".to_string()]
}

fn default_age_column() -> String {
    "Age".to_string()
}

fn default_country_column() -> String {
    "Country".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            delimiter: default_delimiter(),
            multi_value_delimiter: default_multi_value_delimiter(),
            null_values: default_null_values(),
            age_column: default_age_column(),
            country_column: default_country_column(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self { top_n: default_top_n() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
}

fn default_tick_rate() -> u64 {
    200
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file. Without one, the terminal dashboard discards log output.
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// `./survey_dash.toml` when present, otherwise defaults. Environment
    /// overrides apply either way.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            return Self::load_with_env(path);
        }
        Ok(Self::from_env())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SURVEY_DASH_DATA") {
            self.data.path = PathBuf::from(path);
        }
        if let Ok(top_n) = std::env::var("SURVEY_DASH_TOP_N") {
            match top_n.parse() {
                Ok(n) if n > 0 => self.charts.top_n = n,
                _ => self
                    .warnings
                    .push(format!("ignoring SURVEY_DASH_TOP_N={:?}: expected a positive integer", top_n)),
            }
        }
        if let Ok(level) = std::env::var("SURVEY_DASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(file) = std::env::var("SURVEY_DASH_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.data.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "data.delimiter must be a single ASCII character, got {:?}",
                self.data.delimiter
            )));
        }
        if self.data.delimiter == self.data.multi_value_delimiter {
            return Err(ConfigError::Invalid(
                "data.delimiter and data.multi_value_delimiter must differ".to_string(),
            ));
        }
        if self.charts.top_n == 0 {
            return Err(ConfigError::Invalid("charts.top_n must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.data.delimiter as u8,
            null_values: self.data.null_values.clone(),
        }
    }

    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            top_n: self.charts.top_n,
            multi_value_delimiter: self.data.multi_value_delimiter,
            age_column: self.data.age_column.clone(),
            country_column: self.data.country_column.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub fn generate_default_config() -> String {
    r#"# survey_dash configuration
#
# Environment variables override these settings:
# - SURVEY_DASH_DATA
# - SURVEY_DASH_TOP_N
# - SURVEY_DASH_LOG_LEVEL
# - SURVEY_DASH_LOG_FILE

[data]
path = "data/survey.csv"
delimiter = ","
# Separator inside multi-valued answers such as LanguageHaveWorkedWith
multi_value_delimiter = ";"
null_values = ["", "NA"]
age_column = "Age"
country_column = "Country"

[charts]
top_n = 20

[ui]
tick_rate_ms = 200

[logging]
level = "info"
# file = "survey_dash.log"
"#
    .to_string()
}
