//! Config command implementations

use anyhow::{anyhow, Result};

use crate::cli::ConfigCommand;
use crate::config::{self as app_config, AppConfig, RuntimeContext};
use crate::output::print_output;

const REDACTED: &str = "********";

pub fn run(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Get { key } => get(ctx, key.as_deref()),
        ConfigCommand::Reset => reset(ctx),
    }
}

/// Copy of the config that is safe to print
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.device.password.is_some() {
        shown.device.password = Some(REDACTED.to_string());
    }
    shown
}

fn show(ctx: &RuntimeContext) -> Result<()> {
    print_output(ctx, &redacted(&ctx.config))
}

fn path(ctx: &RuntimeContext) -> Result<()> {
    println!("{}", ctx.config_path().display());
    Ok(())
}

fn get(ctx: &RuntimeContext, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => {
            println!("{}", get_config_value(&redacted(&ctx.config), key)?);
            Ok(())
        }
        None => show(ctx),
    }
}

fn reset(ctx: &RuntimeContext) -> Result<()> {
    app_config::write_default_config(ctx.config_path())?;
    println!(
        "Configuration reset to defaults at: {}",
        ctx.config_path().display()
    );
    Ok(())
}

fn get_config_value(config: &AppConfig, key: &str) -> Result<String> {
    let json = serde_json::to_value(config)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow!("Configuration key not found: {key}"))?;
    }

    Ok(match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => serde_json::to_string(other)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_value() {
        let config = AppConfig::default();

        assert_eq!(get_config_value(&config, "device.timeout").unwrap(), "30");
        assert_eq!(get_config_value(&config, "device.port").unwrap(), "4321");
        assert_eq!(get_config_value(&config, "device.retry").unwrap(), "true");
        assert_eq!(get_config_value(&config, "device.host").unwrap(), "null");
        assert!(get_config_value(&config, "nonexistent.key").is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let mut config = AppConfig::default();
        config.device.password = Some("eMlG".to_string());

        let shown = redacted(&config);
        assert_eq!(
            get_config_value(&shown, "device.password").unwrap(),
            REDACTED
        );
        assert_eq!(config.device.password.as_deref(), Some("eMlG"));

        let unset = redacted(&AppConfig::default());
        assert_eq!(unset.device.password, None);
    }
}
