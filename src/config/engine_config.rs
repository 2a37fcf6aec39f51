//! Engine Configuration - lens constants and cross-check policy as TOML
//!
//! Formula coefficients are fixed per formula and never configurable. What
//! lives here is what varies per clinic: the implanted lens, the usual
//! target refraction, and which formulas to cross-check.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::biometry::HaigisConstants;
use crate::types::Formula;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "IOL_POWER_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "iol_power.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$IOL_POWER_CONFIG`
/// 2. `./iol_power.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub lens: LensConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub crosscheck: CrossCheckConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order.
    ///
    /// Never fails: an unreadable or invalid file is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(Some(path.to_path_buf()), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; they never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(None, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate values for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// The implanted lens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensConfig {
    /// SRK/T A-constant.
    #[serde(default = "default_a_constant")]
    pub a_constant: f64,

    /// Haigis a0; derived from the A-constant when absent.
    #[serde(default)]
    pub haigis_a0: Option<f64>,

    #[serde(default = "default_haigis_a1")]
    pub haigis_a1: f64,

    #[serde(default = "default_haigis_a2")]
    pub haigis_a2: f64,
}

fn default_a_constant() -> f64 {
    118.4
}
fn default_haigis_a1() -> f64 {
    HaigisConstants::default().a1
}
fn default_haigis_a2() -> f64 {
    HaigisConstants::default().a2
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            a_constant: default_a_constant(),
            haigis_a0: None,
            haigis_a1: default_haigis_a1(),
            haigis_a2: default_haigis_a2(),
        }
    }
}

impl LensConfig {
    pub fn haigis_constants(&self) -> HaigisConstants {
        HaigisConstants {
            a0: self.haigis_a0,
            a1: self.haigis_a1,
            a2: self.haigis_a2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Default target refraction (D) when a measurement carries none.
    #[serde(default)]
    pub refraction_d: f64,
}

/// Multi-formula cross-check policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckConfig {
    /// Formulas to evaluate, in report order.
    #[serde(default = "default_formulas")]
    pub formulas: Vec<Formula>,

    /// Spread (max - min, D) above which formulas are considered to disagree.
    #[serde(default = "default_spread_warning")]
    pub spread_warning_d: f64,
}

fn default_formulas() -> Vec<Formula> {
    Formula::ALL.to_vec()
}
fn default_spread_warning() -> f64 {
    1.0
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            formulas: default_formulas(),
            spread_warning_d: default_spread_warning(),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(Option<PathBuf>, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(Some(path), e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Parse(None, e) => write!(f, "Config parse error: {e}"),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            Self::Parse(_, e) => Some(e),
            Self::Serialize(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
[lens]
a_constant = 119.0
haigis_a0 = 1.36
"#,
        )
        .unwrap();
        assert_eq!(config.lens.a_constant, 119.0);
        assert_eq!(config.lens.haigis_constants().a0, Some(1.36));
        assert_eq!(config.lens.haigis_a1, 0.4);
        assert_eq!(config.crosscheck, CrossCheckConfig::default());
    }

    #[test]
    fn test_unknown_formula_name_is_parse_error() {
        let err = EngineConfig::from_toml_str(
            r#"
[crosscheck]
formulas = ["srk_t", "holladay"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(None, _)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EngineConfig::default();
        config.crosscheck.formulas = vec![Formula::HofferQ, Formula::Besst];
        config.target.refraction_d = -0.5;
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_error_lists_problems() {
        let err = EngineConfig::from_toml_str(
            r#"
[crosscheck]
formulas = []
spread_warning_d = -1.0
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2, "{errors:?}"),
            other => panic!("expected validation error, got {other}"),
        }
    }
}
