//! Config subcommand handlers.

use vara_config::{self as config, Config, DEFAULT_PROFILE, Profile, validate_mycall};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let text = toml::to_string_pretty(&cfg).map_err(config::ConfigError::from)?;
            print!("{text}");
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config {
                mycall: global.mycall.as_deref().map(validate_mycall).transpose()?,
                ..Config::default()
            };
            cfg.profiles.insert(DEFAULT_PROFILE.into(), Profile::default());

            let written = config::save_config(&cfg)?;
            eprintln!("Wrote {}", written.display());
            Ok(())
        }
    }
}
