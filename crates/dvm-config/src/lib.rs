//! Configuration file for the dvm CLI
//!
//! The file is TOML. Its location is, in order: the `DVM_CONFIG` environment
//! variable, the path stored in a `.dvm_config_path` pointer file next to the
//! default location, or `~/.config/dvm/dvm.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "DVM_CONFIG";
const POINTER_FILE: &str = ".dvm_config_path";
const DEFAULT_PLUGIN_DIR: &str = "$HOME/.local/share/dvm/plugins";
const DEFAULT_INDENT_WIDTH: usize = 2;

/// Keys accepted by `get`/`set`, in display order
pub const KEYS: &[&str] = &["store-path", "output-dir", "decode-mode", "indent-width", "plugin-dir"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Could not determine home directory")]
    NoHomeDirectory,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_width: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<String>,
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)
}

/// Default config file path (platform-appropriate)
pub fn default_path() -> Result<PathBuf, ConfigError> {
    #[cfg(not(target_os = "windows"))]
    let default = home_dir()?.join(".config").join("dvm").join("dvm.toml");

    #[cfg(target_os = "windows")]
    let default = dirs::config_dir()
        .ok_or(ConfigError::NoHomeDirectory)?
        .join("dvm")
        .join("dvm.toml");

    Ok(default)
}

/// Pointer file that redirects the config location
pub fn pointer_path() -> Result<PathBuf, ConfigError> {
    let default = default_path()?;
    Ok(default
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(POINTER_FILE))
}

/// Read a pointer file; `None` when it is missing or empty
pub fn read_pointer(pointer: &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(pointer).ok()?;
    let trimmed = contents.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// Redirect the config location by writing the pointer file
pub fn set_config_path(new_path: &str) -> Result<PathBuf, ConfigError> {
    let pointer = pointer_path()?;
    if let Some(parent) = pointer.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pointer, new_path.trim().as_bytes())?;
    Ok(pointer)
}

impl Config {
    /// Resolved config file path
    pub fn path() -> Result<PathBuf, ConfigError> {
        // Honor explicit override via DVM_CONFIG for tests / isolated runs.
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        if let Some(redirected) = read_pointer(&pointer_path()?) {
            return Ok(redirected);
        }

        default_path()
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "store-path" => self.store_path.clone(),
            "output-dir" => self.output_dir.clone(),
            "decode-mode" => self.decode_mode.clone(),
            "indent-width" => self.indent_width.map(|w| w.to_string()),
            "plugin-dir" => self.plugin_dir.clone(),
            _ => None,
        }
    }

    /// Set a key, validating the value where the key has a fixed format
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match key {
            "store-path" => self.store_path = Some(value.to_string()),
            "output-dir" => self.output_dir = Some(value.to_string()),
            "decode-mode" => match value {
                "lenient" | "strict" => self.decode_mode = Some(value.to_string()),
                _ => return Err(invalid("expected 'lenient' or 'strict'")),
            },
            "indent-width" => match value.parse::<usize>() {
                Ok(width) if (1..=16).contains(&width) => self.indent_width = Some(width),
                _ => return Err(invalid("expected a number between 1 and 16")),
            },
            "plugin-dir" => self.plugin_dir = Some(value.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values_iter().is_empty()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    /// SQLite store location
    pub fn get_store_path(&self) -> Result<PathBuf, ConfigError> {
        match self.store_path {
            Some(ref path) => Ok(PathBuf::from(path)),
            None => Ok(home_dir()?
                .join(".local")
                .join("share")
                .join("dvm")
                .join("dvm.db")),
        }
    }

    /// Root directory for generated files
    pub fn get_output_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.output_dir {
            Some(ref path) => Ok(PathBuf::from(path)),
            None => Ok(home_dir()?.join(".config").join("dvm").join("generated")),
        }
    }

    /// `lenient` unless configured otherwise
    pub fn get_decode_mode(&self) -> &str {
        self.decode_mode.as_deref().unwrap_or("lenient")
    }

    pub fn get_indent_width(&self) -> usize {
        self.indent_width.unwrap_or(DEFAULT_INDENT_WIDTH)
    }

    /// Checkout root for manually loaded shell plugins; may reference `$HOME`
    pub fn get_plugin_dir(&self) -> String {
        self.plugin_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_PLUGIN_DIR.to_string())
    }
}
