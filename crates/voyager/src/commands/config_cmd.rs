//! Config subcommand handlers.

use voyager_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(voyager_config::config_path);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = voyager_config::load_config_from(&path)?;
            // Never echo a plaintext password.
            if cfg.password.is_some() {
                cfg.password = Some("********".into());
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?;
            print!("{rendered}");
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let cfg = Config {
                account: global.account.clone(),
                insecure: global.insecure,
                ..Config::default()
            };
            voyager_config::save_config_to(&path, &cfg)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }
    }
}
