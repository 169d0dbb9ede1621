use crate::cli::ConfigCommand;
use crate::config::{Config, global_config_path, save_config, save_global_config};
use crate::error::{ConfigError, InsightsError};
use colored::Colorize;

pub fn handle_config(command: ConfigCommand, config: &Config) -> crate::Result<()> {
    match command {
        ConfigCommand::Show => {
            let text = toml::to_string_pretty(&config.redacted())
                .map_err(|e| ConfigError::ParsingFailed(e.to_string()))?;
            println!("{}", text);
            Ok(())
        }
        ConfigCommand::Init { path, force } => {
            let target = match &path {
                Some(path) => path.clone(),
                None => global_config_path()
                    .ok_or_else(|| ConfigError::MissingValue("home directory".to_string()))?,
            };
            if target.exists() && !force {
                return Err(InsightsError::Aborted(format!(
                    "{} already exists (use --force to overwrite)",
                    target.display()
                )));
            }
            let path = match path {
                Some(path) => {
                    save_config(&Config::default(), &path)?;
                    path
                }
                None => save_global_config(&Config::default())?,
            };
            println!(
                "{} Wrote default configuration to {}",
                "✅".green(),
                path.display().to_string().cyan()
            );
            println!("   Fill in the elasticsearch, kibana and atlassian sections before use");
            Ok(())
        }
    }
}
