use dayline_core::config::ClientConfig;

use crate::cli::ConfigAction;
use crate::commands::common::{load_config, AppPaths};
use crate::error::CliError;

pub fn run_config(action: ConfigAction, paths: &AppPaths) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let config = load_config(paths)?;
            println!("Config file: {}", paths.config_file.display());
            println!("Data dir: {}", paths.data_dir.display());
            println!("{}", serde_json::to_string_pretty(&redacted(config))?);
        }
        ConfigAction::Set {
            database_url,
            auth_token,
            page_size,
            sync_interval_secs,
        } => {
            let current = ClientConfig::load(&paths.config_file)?;
            let updated = apply_config_updates(
                current,
                ConfigUpdates {
                    database_url,
                    auth_token,
                    page_size,
                    sync_interval_secs,
                },
            )?;
            updated.save(&paths.config_file)?;
            println!("Saved {}", paths.config_file.display());
        }
    }
    Ok(())
}

/// Values given to `config set`
#[derive(Debug, Default)]
pub struct ConfigUpdates {
    pub database_url: Option<String>,
    pub auth_token: Option<String>,
    pub page_size: Option<usize>,
    pub sync_interval_secs: Option<u64>,
}

/// Merge `updates` into `config`; an empty string clears a value.
pub fn apply_config_updates(
    mut config: ClientConfig,
    updates: ConfigUpdates,
) -> Result<ClientConfig, CliError> {
    if let Some(url) = updates.database_url {
        config.database_url = Some(url);
    }
    if let Some(token) = updates.auth_token {
        config.auth_token = Some(token);
    }
    if updates.page_size.is_some() {
        config.page_size = updates.page_size;
    }
    if updates.sync_interval_secs.is_some() {
        config.sync_interval_secs = updates.sync_interval_secs;
    }
    // Same validation as a loaded file
    Ok(ClientConfig::parse(&serde_json::to_string(&config)?)?)
}

pub fn redacted(mut config: ClientConfig) -> ClientConfig {
    if config.auth_token.is_some() {
        config.auth_token = Some("********".to_string());
    }
    config
}
