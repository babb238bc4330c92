//! Settings file loading.
//!
//! Settings are read from a JSON file given with `--config`; without one the
//! defaults below apply. Every key is optional.
//!
//! ```json
//! {
//!   "logging": { "level": "info" },
//!   "board": { "thickness": 1.6, "paper": "A4" },
//!   "labels": { "offset": 2.0, "text_size": 1.0, "text_thickness": 0.15 }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::core::KiplaceError;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root settings structure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Optional comment field (ignored).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub board: BoardSettings,

    #[serde(default)]
    pub labels: LabelSettings,
}

impl Settings {
    /// Checks value ranges the JSON types cannot express.
    pub fn validate(&self) -> Result<(), KiplaceError> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(KiplaceError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        let positive = [
            ("board.thickness", self.board.thickness),
            ("labels.text_size", self.labels.text_size),
            ("labels.text_thickness", self.labels.text_thickness),
        ];
        for (key, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(KiplaceError::Config(format!(
                    "{} must be a positive number, got {}",
                    key, value
                )));
            }
        }

        if !self.labels.offset.is_finite() {
            return Err(KiplaceError::Config(format!(
                "labels.offset must be finite, got {}",
                self.labels.offset
            )));
        }

        if self.board.paper.trim().is_empty() {
            return Err(KiplaceError::Config("board.paper must not be empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values written into new boards.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoardSettings {
    /// Board thickness in mm.
    #[serde(default = "default_thickness")]
    pub thickness: f64,

    #[serde(default = "default_paper")]
    pub paper: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            thickness: default_thickness(),
            paper: default_paper(),
        }
    }
}

fn default_thickness() -> f64 {
    1.6
}

fn default_paper() -> String {
    "A4".to_string()
}

/// Reference and value labels of placed components.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LabelSettings {
    /// Distance of the labels from the footprint origin in mm. The reference
    /// goes above, the value below.
    #[serde(default = "default_label_offset")]
    pub offset: f64,

    #[serde(default = "default_text_size")]
    pub text_size: f64,

    #[serde(default = "default_text_thickness")]
    pub text_thickness: f64,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            offset: default_label_offset(),
            text_size: default_text_size(),
            text_thickness: default_text_thickness(),
        }
    }
}

fn default_label_offset() -> f64 {
    2.0
}

fn default_text_size() -> f64 {
    1.0
}

fn default_text_thickness() -> f64 {
    0.15
}

/// Loads settings from `path`, or returns the defaults when `path` is `None`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, KiplaceError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };

    if !path.exists() {
        return Err(KiplaceError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        KiplaceError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
        KiplaceError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    settings.validate()?;
    Ok(settings)
}
