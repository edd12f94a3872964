//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use bookshelf_core::fetch::DEFAULT_REQUEST_TIMEOUT;
use bookshelf_core::fetch::constants::CONNECT_TIMEOUT_SECS;

use crate::cli::Cli;

/// TOML-backed file configuration for bookshelf defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Library database location.
    pub database_path: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
    /// Directory for persisted genre lists.
    pub genre_cache_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Tracing filter directive for this setting.
    #[must_use]
    pub fn filter_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bookshelf/config.toml`
/// 2. `$HOME/.config/bookshelf/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("bookshelf")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bookshelf")
            .join("config.toml"),
    )
}

/// Resolves the default library database path.
///
/// Priority:
/// 1. `$XDG_DATA_HOME/bookshelf/library.db`
/// 2. `$HOME/.local/share/bookshelf/library.db`
/// 3. `./bookshelf.db`
#[must_use]
pub fn resolve_default_database_path() -> PathBuf {
    if let Some(xdg_data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data_home)
            .join("bookshelf")
            .join("library.db");
    }
    match env_var_non_empty_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("bookshelf")
            .join("library.db"),
        None => PathBuf::from("bookshelf.db"),
    }
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Runtime settings after merging CLI flags over the config file over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub genre_cache_dir: Option<PathBuf>,
}

impl Settings {
    #[must_use]
    pub fn resolve(cli: &Cli, config: Option<&FileConfig>) -> Self {
        let database_path = cli
            .database
            .clone()
            .or_else(|| config.and_then(|c| c.database_path.clone()))
            .unwrap_or_else(resolve_default_database_path);
        let request_timeout = cli
            .timeout
            .or_else(|| config.and_then(|c| c.request_timeout_secs))
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
        let connect_timeout = Duration::from_secs(
            config
                .and_then(|c| c.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
        );

        Self {
            database_path,
            request_timeout,
            connect_timeout,
            genre_cache_dir: config.and_then(|c| c.genre_cache_dir.clone()),
        }
    }
}

/// Log level before `RUST_LOG` is consulted.
///
/// Priority: quiet flag > verbose flag > config verbosity > `info`.
#[must_use]
pub fn default_log_level(cli: &Cli, config: Option<&FileConfig>) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => config
            .and_then(|c| c.verbosity)
            .map_or("info", VerbositySetting::filter_level),
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bookshelf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let config = parse_config_str(
            r#"
            request_timeout_secs = 60
            verbosity = "quiet"
            "#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_secs, Some(60));
        assert_eq!(config.verbosity, Some(VerbositySetting::Quiet));
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_timeout() {
        let error = parse_config_str("connect_timeout_secs = 0").unwrap_err();
        assert!(error.to_string().contains("connect_timeout_secs"));
        assert!(error.to_string().contains("1..=3600"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        assert!(parse_config_str("concurrency = 4").is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let config = FileConfig {
            database_path: Some(PathBuf::from("/cfg/library.db")),
            request_timeout_secs: Some(60),
            ..FileConfig::default()
        };

        let settings = Settings::resolve(
            &cli(&["--database", "/cli/library.db", "--timeout", "5", "list"]),
            Some(&config),
        );
        assert_eq!(settings.database_path, PathBuf::from("/cli/library.db"));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));

        let settings = Settings::resolve(&cli(&["list"]), Some(&config));
        assert_eq!(settings.database_path, PathBuf::from("/cfg/library.db"));
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_log_level_priority() {
        let config = FileConfig {
            verbosity: Some(VerbositySetting::Debug),
            ..FileConfig::default()
        };
        assert_eq!(default_log_level(&cli(&["-q", "-v", "list"]), Some(&config)), "error");
        assert_eq!(default_log_level(&cli(&["-vv", "list"]), Some(&config)), "trace");
        assert_eq!(default_log_level(&cli(&["list"]), Some(&config)), "debug");
        assert_eq!(default_log_level(&cli(&["list"]), None), "info");
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(load_file_config(Some(&missing)).is_err());

        let present = temp.path().join("config.toml");
        std::fs::write(&present, "request_timeout_secs = 10\n").unwrap();
        let loaded = load_file_config(Some(&present)).unwrap().unwrap();
        assert_eq!(loaded.request_timeout_secs, Some(10));
    }
}
