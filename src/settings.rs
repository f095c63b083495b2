// src/settings.rs
//
// Station settings, loaded from a TOML file and overridden by CLI flags.
// Every field has a default, so a missing file is not an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SettingsError;
use crate::io::serial::FrameFormat;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StationSettings {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_framing")]
    pub framing: String, // "8N1" | "7E1" | ...
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub timing: TimingSettings,
}

/// Probe conversation timing, in units of `unit_ms`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimingSettings {
    #[serde(default = "default_unit_ms")]
    pub unit_ms: u64,
    #[serde(default = "default_port_settle")]
    pub port_settle: u32,
    #[serde(default = "default_mode_settle")]
    pub mode_settle: u32,
    #[serde(default = "default_sample_settle")]
    pub sample_settle: u32,
    #[serde(default = "default_poll_max_wait")]
    pub poll_max_wait: u32,
    #[serde(default = "default_sample_period")]
    pub sample_period: u32, // 5 min less 12 s processing
}

fn default_port() -> String {
    if cfg!(target_os = "windows") {
        "COM3".to_string()
    } else {
        "/dev/ttyACM0".to_string()
    }
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_framing() -> String {
    "8N1".to_string()
}
fn default_database() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("WeatherData.db")
}
fn default_unit_ms() -> u64 {
    1000
}
fn default_port_settle() -> u32 {
    2
}
fn default_mode_settle() -> u32 {
    1
}
fn default_sample_settle() -> u32 {
    2
}
fn default_poll_max_wait() -> u32 {
    10
}
fn default_sample_period() -> u32 {
    288
}

impl Default for StationSettings {
    fn default() -> Self {
        StationSettings {
            port: default_port(),
            baud_rate: default_baud_rate(),
            framing: default_framing(),
            database: default_database(),
            log_dir: None,
            timing: TimingSettings::default(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            unit_ms: default_unit_ms(),
            port_settle: default_port_settle(),
            mode_settle: default_mode_settle(),
            sample_settle: default_sample_settle(),
            poll_max_wait: default_poll_max_wait(),
            sample_period: default_sample_period(),
        }
    }
}

impl StationSettings {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.frame_format()?;
        if self.baud_rate == 0 {
            return Err(SettingsError::Invalid("baud_rate must be non-zero".to_string()));
        }
        if self.port.trim().is_empty() {
            return Err(SettingsError::Invalid("port must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn frame_format(&self) -> Result<FrameFormat, SettingsError> {
        self.framing.parse()
    }
}

/// Default settings location: `<config dir>/probelink/probelink.toml`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("probelink").join("probelink.toml"))
}

/// Load settings from `path`, or from the default location when `None`.
///
/// An explicitly given file must exist. The default file is optional.
pub fn load_settings(path: Option<&Path>) -> Result<StationSettings, SettingsError> {
    let (settings_path, required) = match path {
        Some(p) => (Some(p.to_path_buf()), true),
        None => (default_settings_path(), false),
    };

    let settings = match settings_path {
        Some(p) if required || p.exists() => {
            let content = std::fs::read_to_string(&p).map_err(|source| SettingsError::Read {
                path: p.clone(),
                source,
            })?;
            let mut settings: StationSettings =
                toml::from_str(&content).map_err(|source| SettingsError::Parse {
                    path: p.clone(),
                    source,
                })?;
            settings.database = expand_home(&settings.database);
            settings.log_dir = settings.log_dir.as_deref().map(expand_home);
            settings
        }
        _ => StationSettings::default(),
    };

    settings.validate()?;
    Ok(settings)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
