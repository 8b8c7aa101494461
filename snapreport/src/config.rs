//! Export configuration
//!
//! User-editable toggles that decide which optional content appears in the
//! exported artifact. Filtering is config-driven; parsing never is.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Toggles controlling the exported report contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Emit the cover page (title, task, source URL, thumbnail).
    pub include_cover: bool,
    /// Emit the dedicated screenshot page.
    pub include_screenshot: bool,
    /// Keep sections whose title mentions "automation json".
    pub include_automation_json: bool,
    /// Keep sections whose title mentions "accessibility".
    pub include_accessibility_notes: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_cover: true,
            include_screenshot: true,
            include_automation_json: true,
            include_accessibility_notes: true,
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

/// Errors that can occur when loading or saving the export configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything() {
        let config = ExportConfig::default();
        assert!(config.include_cover);
        assert!(config.include_screenshot);
        assert!(config.include_automation_json);
        assert!(config.include_accessibility_notes);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExportConfig {
            include_cover: false,
            include_screenshot: true,
            include_automation_json: false,
            include_accessibility_notes: true,
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ExportConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let parsed: ExportConfig = toml::from_str("include_cover = false\n").unwrap();
        assert!(!parsed.include_cover);
        assert!(parsed.include_screenshot);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.toml");
        let config = ExportConfig {
            include_screenshot: false,
            ..ExportConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = ExportConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
