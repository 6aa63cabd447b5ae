//! Configuration management for oekofen
//!
//! Supports:
//! - TOML config file at XDG locations
//! - Environment variable overrides
//! - Command-line argument overrides

use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use env_logger::fmt::WriteStyle;
use log::LevelFilter;
use oekofen::{base_url, HttpTransport, Session, SessionOptions};
use serde::{Deserialize, Serialize};

use crate::cli::{GlobalOpts, OutputFormat};

const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Runtime context containing resolved configuration
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub global: GlobalOpts,
    pub config: AppConfig,
    config_path: PathBuf,
}

impl RuntimeContext {
    pub fn new(global: &GlobalOpts) -> Result<Self> {
        let config_path = resolve_config_path(global.config.as_ref())?;
        let config = load_config(&config_path, global)?;

        Ok(Self {
            global: global.clone(),
            config,
            config_path,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn init_logging(&self) -> Result<()> {
        if self.global.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.config.logging.level),
        );

        builder.filter_level(self.effective_log_level());

        let force_color = env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.global.no_color
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !std::io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        builder.try_init().or_else(|err| {
            if self.global.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.global.trace {
            LevelFilter::Trace
        } else if self.global.debug {
            LevelFilter::Debug
        } else {
            match self.global.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    /// Get the effective controller host
    pub fn host(&self) -> Result<&str> {
        self.global
            .host
            .as_deref()
            .or(self.config.device.host.as_deref())
            .ok_or_else(|| {
                anyhow!(
                    "No controller host configured.\n\
                    Set via --host, OEKOFEN_HOST env var, or in config file."
                )
            })
    }

    /// Get the effective JSON interface password
    pub fn password(&self) -> Result<&str> {
        self.global
            .password
            .as_deref()
            .or(self.config.device.password.as_deref())
            .ok_or_else(|| {
                anyhow!(
                    "No JSON interface password configured.\n\
                    Set via --password, OEKOFEN_PASSWORD env var, or in config file."
                )
            })
    }

    pub fn port(&self) -> u16 {
        self.global.port.unwrap_or(self.config.device.port)
    }

    /// Get the effective timeout in seconds
    pub fn timeout(&self) -> u64 {
        self.global.timeout.unwrap_or(self.config.device.timeout)
    }

    /// Delay before the single retry, `None` when retrying is off
    pub fn retry_delay(&self) -> Result<Option<Duration>> {
        if self.global.no_retry || !self.config.device.retry {
            return Ok(None);
        }
        parse_duration(&self.config.device.retry_delay).map(Some)
    }

    pub fn update_interval(&self) -> Result<Duration> {
        parse_duration(&self.config.device.update_interval)
    }

    /// Build a session for the configured controller
    pub fn session(&self) -> Result<Session<HttpTransport>> {
        let host = self.host()?;
        let url = base_url(host, self.port(), self.password()?);
        let transport = HttpTransport::new(url, Duration::from_secs(self.timeout()))
            .context("building HTTP client")?
            .with_retry(self.retry_delay()?);

        let options = SessionOptions {
            update_interval: self.update_interval()?,
            installer_code_format: self.config.device.installer_code_format.clone(),
        };

        Ok(Session::with_options(transport, host, options))
    }

    /// Get the effective output format
    pub fn output_format(&self) -> OutputFormat {
        if self.global.json {
            return OutputFormat::Json;
        }
        self.global
            .output_format
            .unwrap_or(match self.config.output.format.as_str() {
                "json" => OutputFormat::Json,
                "yaml" => OutputFormat::Yaml,
                "table" => OutputFormat::Table,
                _ => OutputFormat::Auto,
            })
    }
}

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: Option<String>,
    pub port: u16,
    pub password: Option<String>,
    pub timeout: u64,
    /// humantime duration, e.g. "10s"
    pub update_interval: String,
    pub retry: bool,
    pub retry_delay: String,
    pub installer_code_format: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: oekofen::transport::DEFAULT_PORT,
            password: None,
            timeout: 30,
            update_interval: "10s".to_string(),
            retry: true,
            retry_delay: "2500ms".to_string(),
            installer_code_format: oekofen::session::DEFAULT_INSTALLER_CODE_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub no_headers: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
            no_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

fn parse_duration(text: &str) -> Result<Duration> {
    humantime::parse_duration(text).with_context(|| format!("parsing duration '{text}'"))
}

fn resolve_config_path(override_path: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        let expanded = expand_path(path)?;
        if expanded.is_dir() {
            return Ok(expanded.join("config.toml"));
        }
        return Ok(expanded);
    }

    Ok(default_config_dir()?.join("config.toml"))
}

fn load_config(config_path: &Path, global: &GlobalOpts) -> Result<AppConfig> {
    // Create default config if it doesn't exist
    if !config_path.exists() {
        write_default_config(config_path)?;
    }

    let defaults = DeviceConfig::default();
    let config = Config::builder()
        .set_default("device.port", i64::from(defaults.port))?
        .set_default("device.timeout", 30_i64)?
        .set_default("device.update_interval", defaults.update_interval)?
        .set_default("device.retry", true)?
        .set_default("device.retry_delay", defaults.retry_delay)?
        .set_default("device.installer_code_format", defaults.installer_code_format)?
        .set_default("output.format", "auto")?
        .set_default("output.no_headers", false)?
        .set_default("logging.level", "warn")?
        .add_source(
            File::from(config_path)
                .format(FileFormat::Toml)
                .required(false),
        )
        // OEKOFEN__DEVICE__HOST=... style overrides
        .add_source(
            Environment::with_prefix("OEKOFEN")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    // Apply CLI overrides
    if global.no_headers {
        app_config.output.no_headers = true;
    }

    Ok(app_config)
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config")?;

    let content = format!(
        "# oekofen configuration\n\
        # File: {}\n\
        #\n\
        # Environment variables:\n\
        #   OEKOFEN_HOST     - Controller host name or IP\n\
        #   OEKOFEN_PASSWORD - JSON interface password\n\
        #   OEKOFEN__*       - Override any config value (e.g., OEKOFEN__LOGGING__LEVEL=debug)\n\
        \n\
        {toml}",
        path.display()
    );

    fs::write(path, content).with_context(|| format!("writing config to {}", path.display()))
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        let expanded = shellexpand::full(text).context("expanding path")?;
        Ok(PathBuf::from(expanded.to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn default_config_dir() -> Result<PathBuf> {
    // Check XDG_CONFIG_HOME first
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["oekofen"];
        argv.extend_from_slice(args);
        argv.push("dump");
        crate::cli::Cli::parse_from(argv).global
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.device.port, 4321);
        assert_eq!(config.device.timeout, 30);
        assert!(config.device.retry);
        assert_eq!(config.device.update_interval, "10s");
        assert_eq!(config.output.format, "auto");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[device]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_default_durations_parse() {
        let config = DeviceConfig::default();
        assert_eq!(
            parse_duration(&config.update_interval).unwrap(),
            Duration::from_secs(10)
        );
        assert_eq!(
            parse_duration(&config.retry_delay).unwrap(),
            Duration::from_millis(2500)
        );
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_load_from_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[device]\nhost = \"10.0.0.5\"\npassword = \"eMlG\"\nupdate_interval = \"30s\"\n",
        )
        .unwrap();

        let path_arg = path.to_str().unwrap();
        let ctx = RuntimeContext::new(&global(&["--config", path_arg, "--port", "8080"])).unwrap();
        assert_eq!(ctx.config_path(), path.as_path());
        assert_eq!(ctx.host().unwrap(), "10.0.0.5");
        assert_eq!(ctx.password().unwrap(), "eMlG");
        assert_eq!(ctx.port(), 8080);
        assert_eq!(ctx.update_interval().unwrap(), Duration::from_secs(30));

        let ctx = RuntimeContext::new(&global(&["--config", path_arg, "-H", "pellematic"])).unwrap();
        assert_eq!(ctx.host().unwrap(), "pellematic");
        assert_eq!(ctx.port(), 4321);
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let ctx = RuntimeContext::new(&global(&["--config", path.to_str().unwrap()])).unwrap();
        assert!(path.exists());
        assert!(ctx.config.device.host.is_none());
    }

    #[test]
    fn test_no_retry_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_arg = path.to_str().unwrap();

        let ctx = RuntimeContext::new(&global(&["--config", path_arg])).unwrap();
        assert_eq!(ctx.retry_delay().unwrap(), Some(Duration::from_millis(2500)));

        let ctx = RuntimeContext::new(&global(&["--config", path_arg, "--no-retry"])).unwrap();
        assert_eq!(ctx.retry_delay().unwrap(), None);
    }

    #[test]
    fn test_json_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = RuntimeContext::new(&global(&["--config", path.to_str().unwrap(), "--json"]))
            .unwrap();
        assert_eq!(ctx.output_format(), OutputFormat::Json);
    }
}
