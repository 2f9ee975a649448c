//! Settings loading.
//!
//! Settings come from a TOML file, by default `<cwd>/.pemu/config.toml`.
//! Keys use snake_case; the camelCase names used by the editor extension
//! are accepted as aliases so an exported settings block can be pasted in.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PemuError, Result};

const DEFAULT_CONFIG_DIR: &str = ".pemu";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// How the editor scrolls to a navigated position.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub enum RevealStrategy {
    #[default]
    Default,
    InCenter,
    InCenterIfOutsideViewport,
    AtTop,
}

impl RevealStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::InCenter => "InCenter",
            Self::InCenterIfOutsideViewport => "InCenterIfOutsideViewport",
            Self::AtTop => "AtTop",
        }
    }
}

impl fmt::Display for RevealStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevealStrategy {
    type Err = PemuError;

    /// Whitespace is ignored, so "In Center" and "InCenter" are the same.
    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "incenter" => Ok(Self::InCenter),
            "incenterifoutsideviewport" => Ok(Self::InCenterIfOutsideViewport),
            "attop" => Ok(Self::AtTop),
            _ => Err(PemuError::Config(format!("unknown reveal type '{s}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for RevealStrategy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// User settings consumed by the command orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Java executable; empty means probe `java` on the PATH.
    #[serde(alias = "javaPath")]
    pub java_path: String,

    /// Path to the PEMU jar; must be an existing file.
    #[serde(alias = "pemuJarPath")]
    pub pemu_jar_path: String,

    /// Flags passed verbatim before every other engine flag.
    #[serde(alias = "pemuArguments")]
    pub pemu_arguments: String,

    /// Navigate to the reported error location after verifying.
    #[serde(alias = "gotoError")]
    pub goto_error: bool,

    #[serde(alias = "gotoErrorRevealType")]
    pub goto_error_reveal_type: RevealStrategy,

    /// Master switch for all status buttons.
    #[serde(alias = "statusBarButtons")]
    pub status_bar_buttons: bool,

    #[serde(alias = "verifyCodeStatusBarButton")]
    pub verify_code_status_bar_button: bool,

    #[serde(alias = "obfuscateCodeStatusBarButton")]
    pub obfuscate_code_status_bar_button: bool,

    #[serde(alias = "openFileStatusBarButton")]
    pub open_file_status_bar_button: bool,

    #[serde(alias = "openStatusBarButton")]
    pub open_status_bar_button: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            java_path: String::new(),
            pemu_jar_path: String::new(),
            pemu_arguments: String::new(),
            goto_error: true,
            goto_error_reveal_type: RevealStrategy::Default,
            status_bar_buttons: true,
            verify_code_status_bar_button: true,
            obfuscate_code_status_bar_button: false,
            open_file_status_bar_button: true,
            open_status_bar_button: false,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Empty text yields the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(contents)?)
    }

    /// Load settings from `explicit` if given, else from the default
    /// location under `cwd`, else fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(PemuError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = default_config_path(cwd);
                if !candidate.is_file() {
                    debug!(path = %candidate.display(), "No config file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        debug!(path = %path.display(), "Loading settings");
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }
}

/// `<cwd>/.pemu/config.toml`
pub fn default_config_path(cwd: &Path) -> PathBuf {
    cwd.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.java_path.is_empty());
        assert!(settings.goto_error);
        assert_eq!(settings.goto_error_reveal_type, RevealStrategy::Default);
        assert!(settings.status_bar_buttons);
        assert!(!settings.open_status_bar_button);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Settings::from_toml_str("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_snake_case_keys() {
        let settings = Settings::from_toml_str(
            r#"
java_path = "/usr/bin/java"
pemu_jar_path = "/opt/pemu.jar"
pemu_arguments = "-nogui"
goto_error = false
goto_error_reveal_type = "AtTop"
"#,
        )
        .unwrap();
        assert_eq!(settings.java_path, "/usr/bin/java");
        assert_eq!(settings.pemu_jar_path, "/opt/pemu.jar");
        assert_eq!(settings.pemu_arguments, "-nogui");
        assert!(!settings.goto_error);
        assert_eq!(settings.goto_error_reveal_type, RevealStrategy::AtTop);
        assert!(settings.verify_code_status_bar_button);
    }

    #[test]
    fn test_camel_case_aliases() {
        let settings = Settings::from_toml_str(
            r#"
pemuJarPath = "/opt/pemu.jar"
gotoErrorRevealType = "In Center If Outside Viewport"
openStatusBarButton = true
"#,
        )
        .unwrap();
        assert_eq!(settings.pemu_jar_path, "/opt/pemu.jar");
        assert_eq!(
            settings.goto_error_reveal_type,
            RevealStrategy::InCenterIfOutsideViewport
        );
        assert!(settings.open_status_bar_button);
    }

    #[test]
    fn test_unknown_reveal_type_is_error() {
        let err = Settings::from_toml_str(r#"goto_error_reveal_type = "Sideways""#).unwrap_err();
        assert!(matches!(err, PemuError::Toml(_)));
    }

    #[test]
    fn test_reveal_strategy_ignores_whitespace() {
        assert_eq!("In Center".parse::<RevealStrategy>().unwrap(), RevealStrategy::InCenter);
        assert_eq!(" AtTop".parse::<RevealStrategy>().unwrap(), RevealStrategy::AtTop);
    }

    #[test]
    fn test_load_missing_default_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_default_location() {
        let dir = TempDir::new().unwrap();
        let path = default_config_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "pemu_arguments = \"-x\"\n").unwrap();

        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.pemu_arguments, "-x");
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.is_configuration());
    }
}
