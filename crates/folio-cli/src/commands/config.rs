//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use folio_core::{Config, LocalBackendKind, VersionPolicy};

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, use_remote, fallback_to_local, remote_url, remote_key, \
                          remote_table, access_token, operator, local_backend, \
                          on_version_mismatch, log_level";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "use_remote": config.use_remote,
                    "fallback_to_local": config.fallback_to_local,
                    "remote_url": config.remote_url,
                    "remote_key": config.remote_key.as_deref().map(mask),
                    "remote_table": config.remote_table,
                    "access_token": config.access_token.as_deref().map(mask),
                    "operator": config.operator,
                    "local_backend": config.local_backend,
                    "on_version_mismatch": config.on_version_mismatch,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  use_remote:          {}", config.use_remote);
            println!("  fallback_to_local:   {}", config.fallback_to_local);
            println!("  remote_url:          {}", or_unset(config.remote_url.as_deref()));
            println!(
                "  remote_key:          {}",
                or_unset(config.remote_key.as_deref().map(mask).as_deref())
            );
            println!("  remote_table:        {}", config.remote_table);
            println!(
                "  access_token:        {}",
                or_unset(config.access_token.as_deref().map(mask).as_deref())
            );
            println!("  operator:            {}", or_unset(config.operator.as_deref()));
            println!("  local_backend:       {:?}", config.local_backend);
            println!("  on_version_mismatch: {:?}", config.on_version_mismatch);
            println!("  log_level:           {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "use_remote" => {
            config.use_remote = value
                .parse()
                .context("Invalid value for use_remote. Use 'true' or 'false'.")?;
        }
        "fallback_to_local" => {
            config.fallback_to_local = value
                .parse()
                .context("Invalid value for fallback_to_local. Use 'true' or 'false'.")?;
        }
        "remote_url" => config.remote_url = optional(value),
        "remote_key" => config.remote_key = optional(value),
        "remote_table" => {
            if value.is_empty() {
                bail!("remote_table cannot be empty");
            }
            config.remote_table = value.to_string();
        }
        "access_token" => config.access_token = optional(value),
        "operator" => config.operator = optional(value),
        "local_backend" => {
            config.local_backend = match value {
                "file" => LocalBackendKind::File,
                "sqlite" => LocalBackendKind::Sqlite,
                _ => bail!("Invalid value for local_backend. Use 'file' or 'sqlite'."),
            };
        }
        "on_version_mismatch" => {
            config.on_version_mismatch = match value {
                "discard" => VersionPolicy::Discard,
                "preserve" => VersionPolicy::Preserve,
                _ => bail!("Invalid value for on_version_mismatch. Use 'discard' or 'preserve'."),
            };
        }
        "log_level" => config.log_level = value.to_string(),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

/// Empty or "none" clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

/// Keep only the first few characters of a secret
fn mask(secret: &str) -> String {
    let shown: String = secret.chars().take(4).collect();
    format!("{}…", shown)
}
