//! CLI-side config resolution: config file + profile + flag overrides,
//! translated into a `vara_core::ModemConfig`.

use vara_config::{Config, ConfigError, profile_to_modem_config, validate_mycall};
use vara_core::ModemConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a modem-bound command needs.
#[derive(Debug)]
pub struct Resolved {
    pub profile: String,
    pub mycall: Option<String>,
    pub modem: ModemConfig,
}

impl Resolved {
    /// The station call sign, required for placing or answering calls.
    pub fn require_mycall(&self) -> Result<&str, CliError> {
        self.mycall.as_deref().ok_or_else(|| CliError::NoCallsign {
            profile: self.profile.clone(),
        })
    }
}

/// Load the config file and apply `--profile`, `--host`, ports and `--mycall`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = vara_config::load_config()?;
    resolve_with(&cfg, global)
}

fn resolve_with(cfg: &Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let (name, mut profile) = cfg
        .profile(global.profile.as_deref())
        .map_err(|e| match e {
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            },
            other => other.into(),
        })?;

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.cmd_port {
        profile.cmd_port = port;
    }
    if let Some(port) = global.data_port {
        profile.data_port = Some(port);
    }

    let modem = profile_to_modem_config(&profile, cfg.debug || global.debug)?;
    let mycall = global
        .mycall
        .clone()
        .or_else(|| cfg.mycall_for(&profile))
        .map(|call| validate_mycall(&call))
        .transpose()?;

    Ok(Resolved {
        profile: name,
        mycall,
        modem,
    })
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}
