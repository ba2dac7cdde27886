//! Shared configuration for VARA modem tools.
//!
//! TOML profiles (one per modem instance, e.g. VARA HF and VARA FM running
//! side by side), environment overrides, and translation to
//! `vara_core::ModemConfig`. The CLI layers its own flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vara_core::{ModemConfig, normalize_callsign};

/// Profile used when neither the config nor the caller names one.
pub const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    /// Station call sign, unless a profile overrides it.
    pub mycall: Option<String>,

    /// Log every command-channel record at info level.
    #[serde(default)]
    pub debug: bool,

    /// Named modem profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            mycall: None,
            debug: false,
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    ///
    /// The default profile need not be written out: a missing entry
    /// resolves to [`Profile::default`]. Any other missing name is an error.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE);

        match self.profiles.get(name) {
            Some(profile) => Ok((name.into(), profile.clone())),
            None if name == DEFAULT_PROFILE => Ok((name.into(), Profile::default())),
            None => Err(ConfigError::UnknownProfile { name: name.into() }),
        }
    }

    /// Call sign for `profile`: the profile's own, else the global one.
    pub fn mycall_for(&self, profile: &Profile) -> Option<String> {
        profile.mycall.clone().or_else(|| self.mycall.clone())
    }
}

/// Where and how to reach one modem instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_cmd_port")]
    pub cmd_port: u16,

    /// Defaults to the command port + 1.
    pub data_port: Option<u16>,

    /// Call sign override for this modem.
    pub mycall: Option<String>,

    /// Seconds allowed for opening a TCP channel.
    pub connect_timeout: Option<u64>,

    /// Seconds an outbound call may take.
    pub dial_timeout: Option<u64>,

    /// Seconds of `BUFFER` silence tolerated by write/flush.
    pub buffer_timeout: Option<u64>,

    /// Seconds a graceful disconnect may take before aborting.
    pub disconnect_timeout: Option<u64>,

    /// Write pacing factor.
    pub write_pacing: Option<usize>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            host: default_host(),
            cmd_port: default_cmd_port(),
            data_port: None,
            mycall: None,
            connect_timeout: None,
            dial_timeout: None,
            buffer_timeout: None,
            disconnect_timeout: None,
            write_pacing: None,
        }
    }
}

fn default_host() -> String {
    "localhost".into()
}
fn default_cmd_port() -> u16 {
    8300
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "varalink", "vara").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vara");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, then apply `VARA_*` overrides.
///
/// A missing file is not an error. Nested keys use `__`, e.g.
/// `VARA_PROFILES__FM__CMD_PORT=8310`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VARA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ModemConfig` from a profile, validating as we go.
pub fn profile_to_modem_config(profile: &Profile, debug: bool) -> Result<ModemConfig, ConfigError> {
    let defaults = ModemConfig::default();

    let host = profile.host.trim();
    if host.is_empty() {
        return Err(validation("host", "must not be empty"));
    }
    if profile.cmd_port == 0 {
        return Err(validation("cmd_port", "must not be 0"));
    }
    let data_port = match profile.data_port {
        Some(port) => port,
        None => profile
            .cmd_port
            .checked_add(1)
            .ok_or_else(|| validation("data_port", "cmd_port + 1 overflows"))?,
    };
    if data_port == 0 || data_port == profile.cmd_port {
        return Err(validation(
            "data_port",
            "must be non-zero and differ from cmd_port",
        ));
    }
    if profile.write_pacing == Some(0) {
        return Err(validation("write_pacing", "must be at least 1"));
    }

    Ok(ModemConfig {
        host: host.into(),
        cmd_port: profile.cmd_port,
        data_port,
        connect_timeout: seconds("connect_timeout", profile.connect_timeout, defaults.connect_timeout)?,
        dial_timeout: seconds("dial_timeout", profile.dial_timeout, defaults.dial_timeout)?,
        buffer_timeout: seconds("buffer_timeout", profile.buffer_timeout, defaults.buffer_timeout)?,
        disconnect_timeout: seconds(
            "disconnect_timeout",
            profile.disconnect_timeout,
            defaults.disconnect_timeout,
        )?,
        write_pacing: profile.write_pacing.unwrap_or(defaults.write_pacing),
        debug,
        ..defaults
    })
}

/// Validate and normalize a configured call sign.
pub fn validate_mycall(call: &str) -> Result<String, ConfigError> {
    normalize_callsign(call).map_err(|e| validation("mycall", &e.to_string()))
}

fn seconds(field: &str, value: Option<u64>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(0) => Err(validation(field, "must be at least 1 second")),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

fn validation(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
