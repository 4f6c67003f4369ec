//! Configuration system for storyteller
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (STORYTELLER_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sink::{phrases, DEFAULT_PHRASES};

/// File name searched for in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "storyteller.toml";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Widest label column the aligned console accepts.
pub const MAX_LABEL_WIDTH: usize = 40;

/// Main storyteller configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Target layer and narration layout
    pub story: StorySettings,

    /// Console sink settings
    pub console: ConsoleSettings,

    /// HTML document sink settings
    pub document: DocumentSettings,

    /// Emphasis and expansion phrases
    pub narration: NarrationSettings,

    /// Engine diagnostics
    pub logging: LoggingSettings,
}

/// Story settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySettings {
    /// Layer whose performers play the personas (unset = default performers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,

    /// Width of the right-aligned label column ("given", "so that", ...)
    pub label_width: usize,
}

/// Console sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub enabled: bool,

    /// Align step keywords in a label column
    pub aligned: bool,

    /// Spaces per nesting level
    pub indent_size: usize,

    /// Deepest nesting level printed (unset = everything)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_level: Option<u32>,
}

/// HTML document sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub enabled: bool,

    /// Root directory for per-test document folders
    pub output_dir: String,

    /// Document file extension
    pub extension: String,

    /// Stylesheet file name written next to the documents
    pub stylesheet: String,
}

/// Narration phrase settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    /// Lines starting with one of these are emphasised
    pub emphasis: Vec<String>,

    /// Sections whose heading starts with one of these render expanded
    pub expand: Vec<String>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Enable JSON formatted logging
    pub json_format: bool,

    /// Number of rotated log files to keep
    pub max_files: u32,
}

// Default implementations

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            layer: None,
            label_width: 9,
        }
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            aligned: true,
            indent_size: 2,
            report_level: None,
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: "target/storyteller".to_string(),
            extension: "html".to_string(),
            stylesheet: "storyteller.css".to_string(),
        }
    }
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            emphasis: phrases(DEFAULT_PHRASES),
            expand: phrases(DEFAULT_PHRASES),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            json_format: false,
            max_files: 5,
        }
    }
}

impl StoryConfig {
    /// Load configuration: file (explicit or searched), then environment
    /// overrides, then path expansion and validation.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse one TOML file without overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from(LOCAL_CONFIG_FILE),
            dirs::config_dir()
                .map(|p| p.join("storyteller").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STORYTELLER_LAYER") {
            self.story.layer = if val.trim().is_empty() { None } else { Some(val) };
        }
        if let Ok(val) = std::env::var("STORYTELLER_OUTPUT_DIR") {
            self.document.output_dir = val;
        }
        if let Ok(val) = std::env::var("STORYTELLER_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("STORYTELLER_DOCUMENT") {
            self.document.enabled = val.to_lowercase() == "true" || val == "1";
        }
    }

    pub(crate) fn expand_paths(&mut self) {
        self.document.output_dir = expand_path(&self.document.output_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Check every setting; the first invalid one is reported.
    pub fn validate(&self) -> Result<()> {
        if let Some(layer) = &self.story.layer {
            if layer.trim().is_empty() {
                return Err(Error::config_field_invalid("story.layer", "layer name cannot be empty"));
            }
        }

        if self.story.label_width == 0 || self.story.label_width > MAX_LABEL_WIDTH {
            return Err(Error::config_field_invalid(
                "story.label_width",
                format!("label_width must be between 1 and {}", MAX_LABEL_WIDTH),
            ));
        }

        if self.console.indent_size == 0 {
            return Err(Error::config_field_invalid(
                "console.indent_size",
                "indent_size must be at least 1",
            ));
        }

        if self.document.extension.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "document.extension",
                "extension cannot be empty",
            ));
        }

        if self.document.output_dir.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "document.output_dir",
                "output_dir cannot be empty",
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::io_write(parent, e))?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::io_write(path, e))?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.document.output_dir)
    }
}

fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location for `config init`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("storyteller").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
}

/// Write a commented default configuration file.
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io_write(parent, e))?;
        }
    }

    fs::write(&config_path, generate_default_config())
        .map_err(|e| Error::io_write(&config_path, e))?;

    Ok(config_path)
}

fn generate_default_config() -> String {
    r#"# storyteller configuration

[story]
# Layer whose performers play the personas, e.g. "presentation" or "rest_api".
# Leave unset to use the performers registered without a layer.
# layer = "presentation"

# Width of the right-aligned keyword column
label_width = 9

[console]
enabled = true

# Align step keywords ("given", "so that", ...) in a column
aligned = true

# Spaces per nesting level
indent_size = 2

# Deepest nesting level printed (comment out to print everything)
# report_level = 1

[document]
enabled = true

# One folder per test is created below this directory
output_dir = "target/storyteller"

extension = "html"
stylesheet = "storyteller.css"

[narration]
# Lines starting with these phrases are emphasised
emphasis = ["I want", "So that", "As", "Given", "When", "Then", "And"]

# Sections whose heading starts with these phrases render expanded
expand = ["I want", "So that", "As", "Given", "When", "Then", "And"]

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "target/storyteller/storyteller.log"

# Enable JSON formatted logging
json_format = false

# Number of rotated log files to keep
max_files = 5
"#
    .to_string()
}
