//! Configuration file parsing and merging
//!
//! This module handles `make/config.toml`, which maps each supported platform
//! key to the directory plugins are installed under, and the optional
//! `make/config.local.toml` that is merged over it.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Name of the configuration file inside the make directory
pub const CONFIG_FILE: &str = "config.toml";

/// Name of the optional machine-local override file
pub const LOCAL_CONFIG_FILE: &str = "config.local.toml";

/// Install target a build was produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKey {
    /// 32-bit Windows VST
    Win32,
    /// 64-bit Windows VST
    X64,
}

impl PlatformKey {
    /// Every supported key
    pub const ALL: [PlatformKey; 2] = [PlatformKey::Win32, PlatformKey::X64];

    /// Key under `[local]` holding the install root for this platform
    pub fn config_key(self) -> &'static str {
        match self {
            PlatformKey::Win32 => "vst-x86-output",
            PlatformKey::X64 => "vst-x64-output",
        }
    }

    /// Canonical spelling, as build systems pass it
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKey::Win32 => "Win32",
            PlatformKey::X64 => "x64",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "win32" | "x86" => Ok(PlatformKey::Win32),
            "x64" => Ok(PlatformKey::X64),
            _ => Err(Error::platform(
                format!("Unrecognized platform key '{}'", s),
                format!(
                    "Supported platform keys are: {}",
                    PlatformKey::ALL
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Install roots per platform
    pub local: LocalConfig,

    /// Prebuilt JIT compiler settings
    pub jit: JitConfig,
}

/// Install roots, one per [`PlatformKey`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Install root for [`PlatformKey::Win32`]
    #[serde(rename = "vst-x86-output", skip_serializing_if = "Option::is_none")]
    pub vst_x86_output: Option<Utf8PathBuf>,

    /// Install root for [`PlatformKey::X64`]
    #[serde(rename = "vst-x64-output", skip_serializing_if = "Option::is_none")]
    pub vst_x64_output: Option<Utf8PathBuf>,
}

/// libCppJit download settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// Release to fetch during `prepare` when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Config {
    /// Configuration written by `prepare` when none exists yet
    pub fn bootstrap_default() -> Self {
        Self {
            local: LocalConfig {
                vst_x86_output: Some(Utf8PathBuf::from("C:/Audio/VSTx86")),
                vst_x64_output: Some(Utf8PathBuf::from("C:/Audio/VSTx64")),
            },
            jit: JitConfig::default(),
        }
    }

    /// Load configuration from the make directory.
    ///
    /// `config.toml` must exist; `config.local.toml` is merged over it when present.
    pub fn load(make_dir: &Utf8Path) -> Result<Self> {
        let config_path = make_dir.join(CONFIG_FILE);
        let local_config_path = make_dir.join(LOCAL_CONFIG_FILE);

        if !config_path.is_file() {
            return Err(Error::config(
                format!("Configuration file not found at {}", config_path),
                "Run `apedeploy prepare` first to create a default configuration",
            ));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let base_config = toml::from_str::<toml::Value>(&content)?;

        let merged = if local_config_path.is_file() {
            let content = std::fs::read_to_string(&local_config_path)?;
            merge_toml_values(base_config, toml::from_str::<toml::Value>(&content)?)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;
        tracing::debug!(path = %config_path, "Loaded configuration");

        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Write the bootstrap configuration unless a configuration file already exists.
    ///
    /// Returns whether a file was created.
    pub fn write_default(make_dir: &Utf8Path) -> Result<bool> {
        let config_path = make_dir.join(CONFIG_FILE);
        if config_path.exists() {
            tracing::info!(path = %config_path, "Reading existing configuration");
            return Ok(false);
        }

        std::fs::create_dir_all(make_dir)?;
        let content = toml::to_string_pretty(&Self::bootstrap_default())?;
        std::fs::write(&config_path, content)?;

        tracing::info!(path = %config_path, "Created default configuration");
        Ok(true)
    }

    /// Install root configured for a platform
    pub fn output_root(&self, key: PlatformKey) -> Result<&Utf8Path> {
        let root = match key {
            PlatformKey::Win32 => self.local.vst_x86_output.as_deref(),
            PlatformKey::X64 => self.local.vst_x64_output.as_deref(),
        };

        root.ok_or_else(|| {
            Error::platform(
                format!("No install root configured for platform {}", key),
                format!("Set `{}` in the [local] section of make/{}", key.config_key(), CONFIG_FILE),
            )
        })
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays and primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_dir(temp_dir: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(temp_dir.path()).unwrap()
    }

    #[test]
    fn test_platform_key_parse() {
        assert_eq!("Win32".parse::<PlatformKey>().unwrap(), PlatformKey::Win32);
        assert_eq!("x86".parse::<PlatformKey>().unwrap(), PlatformKey::Win32);
        assert_eq!("x64".parse::<PlatformKey>().unwrap(), PlatformKey::X64);
        assert_eq!("X64".parse::<PlatformKey>().unwrap(), PlatformKey::X64);

        let err = "ARM64".parse::<PlatformKey>().unwrap_err();
        assert!(matches!(err, Error::Platform { .. }));
    }

    #[test]
    fn test_platform_key_config_keys() {
        assert_eq!(PlatformKey::Win32.config_key(), "vst-x86-output");
        assert_eq!(PlatformKey::X64.config_key(), "vst-x64-output");
        assert_eq!(PlatformKey::X64.to_string(), "x64");
    }

    #[test]
    fn test_parse_config() {
        let content = r#"
[local]
vst-x86-output = "D:/VST32"
vst-x64-output = "D:/VST64"

[jit]
version = "0.2.1"
"#;

        let config = Config::parse(content).unwrap();

        assert_eq!(
            config.output_root(PlatformKey::Win32).unwrap(),
            Utf8Path::new("D:/VST32")
        );
        assert_eq!(
            config.output_root(PlatformKey::X64).unwrap(),
            Utf8Path::new("D:/VST64")
        );
        assert_eq!(config.jit.version.as_deref(), Some("0.2.1"));
    }

    #[test]
    fn test_missing_output_root() {
        let config = Config::parse("[local]\nvst-x64-output = \"D:/VST64\"\n").unwrap();

        let err = config.output_root(PlatformKey::Win32).unwrap_err();
        assert!(matches!(err, Error::Platform { .. }));
    }

    #[test]
    fn test_load_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let err = Config::load(make_dir(&temp_dir)).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_load_with_local_override() {
        let temp_dir = TempDir::new().unwrap();
        let dir = make_dir(&temp_dir);

        std::fs::write(
            dir.join(CONFIG_FILE),
            "[local]\nvst-x86-output = \"C:/A\"\nvst-x64-output = \"C:/B\"\n",
        )
        .unwrap();
        std::fs::write(dir.join(LOCAL_CONFIG_FILE), "[local]\nvst-x64-output = \"E:/B\"\n").unwrap();

        let config = Config::load(dir).unwrap();

        assert_eq!(config.output_root(PlatformKey::Win32).unwrap(), Utf8Path::new("C:/A"));
        assert_eq!(config.output_root(PlatformKey::X64).unwrap(), Utf8Path::new("E:/B"));
    }

    #[test]
    fn test_write_default_creates_both_keys() {
        let temp_dir = TempDir::new().unwrap();
        let dir = make_dir(&temp_dir).join("make");

        assert!(Config::write_default(&dir).unwrap());

        let content = std::fs::read_to_string(dir.join(CONFIG_FILE)).unwrap();
        assert!(content.contains("vst-x86-output"));
        assert!(content.contains("vst-x64-output"));

        let config = Config::load(&dir).unwrap();
        assert_eq!(config.output_root(PlatformKey::Win32).unwrap(), Utf8Path::new("C:/Audio/VSTx86"));
        assert_eq!(config.output_root(PlatformKey::X64).unwrap(), Utf8Path::new("C:/Audio/VSTx64"));
    }

    #[test]
    fn test_write_default_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = make_dir(&temp_dir);
        let existing = "[local]\nvst-x64-output = \"F:/Mine\"\n";
        std::fs::write(dir.join(CONFIG_FILE), existing).unwrap();

        assert!(!Config::write_default(dir).unwrap());
        assert_eq!(std::fs::read_to_string(dir.join(CONFIG_FILE)).unwrap(), existing);
    }
}
