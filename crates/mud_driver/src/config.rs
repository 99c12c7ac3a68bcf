//! # Driver Configuration
//!
//! Settings are read from a TOML file once at startup, merged with
//! command-line overrides, validated, and then handed to the rest of the
//! driver as plain typed values.
//!
//! ```toml
//! mud_dir = "/srv/mud/lib"
//! driver_log_dir = "${mud_dir}/log/driver"
//! memory_reserve = 10_000_000
//! ```
//!
//! Game directories may start with `${mud_dir}`, which is replaced by the
//! mud directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DriverError, DriverResult};

/// Default name of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "mud.toml";

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_MS: u64 = 1000;

/// Prefix in game directory settings standing for the mud directory.
const MUD_DIR_PREFIX: &str = "${mud_dir}";

/// Description of one setting, for the template.
struct SettingInfo {
    name: &'static str,
    description: &'static str,
    example: &'static str,
}

const SETTINGS: &[SettingInfo] = &[
    SettingInfo {
        name: "mud_dir",
        description: "The root directory of the mudlib, which may be specified relative \
                      to the driver process' working directory. Required.",
        example: "\"lib\"",
    },
    SettingInfo {
        name: "driver_log_dir",
        description: "The directory in which to keep the driver logs. If the path starts \
                      with '${mud_dir}', it is interpreted relative to the mud_dir setting.",
        example: "\"${mud_dir}/log\"",
    },
    SettingInfo {
        name: "game_log_dir",
        description: "The directory in which to keep the game logs. If the path starts \
                      with '${mud_dir}', it is interpreted relative to the mud_dir setting.",
        example: "\"${mud_dir}/log\"",
    },
    SettingInfo {
        name: "memory_reserve",
        description: "Bytes of memory to set aside as an out-of-memory early warning. \
                      0 disables the reserve.",
        example: "0",
    },
    SettingInfo {
        name: "heartbeat_interval_ms",
        description: "Milliseconds between two heartbeats of the game loop.",
        example: "1000",
    },
];

/// Settings as written in the configuration file, before validation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Root directory of the mudlib.
    pub mud_dir: Option<PathBuf>,
    /// Directory for driver logs.
    pub driver_log_dir: Option<String>,
    /// Directory for game logs.
    pub game_log_dir: Option<String>,
    /// Memory reserve in bytes.
    pub memory_reserve: Option<u64>,
    /// Heartbeat period in milliseconds.
    pub heartbeat_interval_ms: Option<u64>,
}

/// Values given on the command line. They win over the file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Root directory of the mudlib.
    pub mud_dir: Option<PathBuf>,
    /// Memory reserve in bytes.
    pub memory_reserve: Option<u64>,
}

impl ConfigOverrides {
    /// Returns true if no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mud_dir.is_none() && self.memory_reserve.is_none()
    }
}

impl ConfigFile {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// [`DriverError::ConfigParse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> DriverResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// [`DriverError::ConfigRead`] if the file can't be read,
    /// [`DriverError::ConfigParse`] if it can't be parsed.
    pub fn load(path: &Path) -> DriverResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(dir) = &overrides.mud_dir {
            self.mud_dir = Some(dir.clone());
        }
        if let Some(bytes) = overrides.memory_reserve {
            self.memory_reserve = Some(bytes);
        }
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidConfig`] listing every setting that failed.
    pub fn validate(&self) -> DriverResult<DriverConfig> {
        let mut errors = Vec::new();

        let mud_dir = match &self.mud_dir {
            None => {
                errors.push("Setting 'mud_dir': Setting is required.".to_string());
                None
            }
            Some(dir) => match dir.canonicalize() {
                Ok(abs) if abs.is_dir() => Some(abs),
                _ => {
                    errors.push(format!(
                        "Setting 'mud_dir': '{}' doesn't exist, or is not a directory.",
                        dir.display()
                    ));
                    None
                }
            },
        };

        let default_log_dir = format!("{MUD_DIR_PREFIX}/log");
        let mut game_dir = |name: &str, value: Option<&String>| {
            let value = value.map_or(default_log_dir.as_str(), String::as_str);
            resolve_game_dir(value, mud_dir.as_deref())
                .map_err(|msg| errors.push(format!("Setting '{name}': {msg}")))
                .ok()
        };
        let driver_log_dir = game_dir("driver_log_dir", self.driver_log_dir.as_ref());
        let game_log_dir = game_dir("game_log_dir", self.game_log_dir.as_ref());

        let heartbeat_ms = self.heartbeat_interval_ms.unwrap_or(DEFAULT_HEARTBEAT_MS);
        if heartbeat_ms == 0 {
            errors.push("Setting 'heartbeat_interval_ms': must be greater than 0.".to_string());
        }

        match (mud_dir, driver_log_dir, game_log_dir) {
            (Some(mud_dir), Some(driver_log_dir), Some(game_log_dir)) if errors.is_empty() => {
                Ok(DriverConfig {
                    mud_dir,
                    driver_log_dir,
                    game_log_dir,
                    memory_reserve: self.memory_reserve.unwrap_or(0),
                    heartbeat_interval: Duration::from_millis(heartbeat_ms),
                })
            }
            _ => Err(DriverError::InvalidConfig(format!("  {}", errors.join("\n  ")))),
        }
    }
}

/// Resolves a game directory setting to an absolute path.
fn resolve_game_dir(value: &str, mud_dir: Option<&Path>) -> Result<PathBuf, String> {
    let path = if let Some(rest) = value.strip_prefix(MUD_DIR_PREFIX) {
        let Some(root) = mud_dir else {
            return Err(format!("'{value}' references uninitialized setting 'mud_dir'."));
        };
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rest)
        }
    } else if value.starts_with("${") {
        return Err(format!("'{value}' references an undefined setting."));
    } else {
        PathBuf::from(value)
    };

    if path.exists() && !path.is_dir() {
        return Err(format!("'{value}' exists, but is not a directory."));
    }
    if path.is_absolute() {
        return Ok(path);
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| format!("'{value}' can't be resolved to an absolute path: {e}"))
}

/// Validated driver settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Absolute root directory of the mudlib.
    pub mud_dir: PathBuf,
    /// Absolute directory for driver logs. May not exist yet.
    pub driver_log_dir: PathBuf,
    /// Absolute directory for game logs. May not exist yet.
    pub game_log_dir: PathBuf,
    /// Memory reserve in bytes; `0` disables it.
    pub memory_reserve: u64,
    /// Heartbeat period.
    pub heartbeat_interval: Duration,
}

impl DriverConfig {
    /// Loads, overrides and validates the settings.
    ///
    /// A missing file is tolerated when overrides are given.
    ///
    /// # Errors
    ///
    /// Any read, parse or validation error.
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> DriverResult<Self> {
        let file = match ConfigFile::load(path) {
            Ok(file) => file,
            Err(DriverError::ConfigRead { source, .. }) if !overrides.is_empty() => {
                tracing::warn!(path = %path.display(), error = %source, "problem loading configuration, using overrides only");
                ConfigFile::default()
            }
            Err(e) => return Err(e),
        };
        file.with_overrides(overrides).validate()
    }

    /// Renders the effective settings as TOML.
    #[must_use]
    pub fn effective_settings(&self) -> String {
        let mut out = String::from("# -- Effective driver configuration --\n");
        let _ = writeln!(out, "mud_dir = {}", toml_path(&self.mud_dir));
        let _ = writeln!(out, "driver_log_dir = {}", toml_path(&self.driver_log_dir));
        let _ = writeln!(out, "game_log_dir = {}", toml_path(&self.game_log_dir));
        let _ = writeln!(out, "memory_reserve = {}", self.memory_reserve);
        let _ = writeln!(out, "heartbeat_interval_ms = {}", self.heartbeat_interval.as_millis());
        out.push_str("# -- END of effective driver configuration --\n");
        out
    }
}

fn toml_path(path: &Path) -> String {
    toml::Value::String(path.display().to_string()).to_string()
}

/// Renders a commented configuration template listing every setting.
#[must_use]
pub fn template() -> String {
    let mut out = String::from(
        "# This is a template driver configuration file.\n\
         #\n\
         # Settings with defaults show their default value as example value.\n\
         # Command line values override the corresponding file values.\n\n",
    );
    for setting in SETTINGS {
        let _ = writeln!(out, "# {}", setting.description);
        let _ = writeln!(out, "# {} = {}\n", setting.name, setting.example);
    }
    out
}
