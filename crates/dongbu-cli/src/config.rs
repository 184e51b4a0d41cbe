// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dongbu_app::TabKind;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "dongbu";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CARS: [&str; 2] = ["서울82바1253", "서울82바1252"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub cars: Cars,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            remote: Remote::default(),
            cars: Cars::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Remote {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cars {
    pub numbers: Vec<String>,
}

impl Default for Cars {
    fn default() -> Self {
        Self {
            numbers: DEFAULT_CARS.iter().map(|car| (*car).to_owned()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub start_tab: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

/// Connection settings resolved from the file and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DONGBU_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DONGBU_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [remote], [cars], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(url) = &self.remote.url {
            validate_url(url)
                .with_context(|| format!("remote.url in {} is invalid", path.display()))?;
        }

        if let Some(timeout) = &self.remote.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "remote.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if self.cars.numbers.is_empty() {
            bail!(
                "cars.numbers in {} must list at least one car",
                path.display()
            );
        }
        if self.cars.numbers.iter().any(|car| car.trim().is_empty()) {
            bail!(
                "cars.numbers in {} contains a blank entry; remove it",
                path.display()
            );
        }

        if let Some(tab) = &self.ui.start_tab
            && TabKind::parse(tab).is_none()
        {
            bail!(
                "ui.start_tab in {} is {:?}; use one of: board, storage, car, account",
                path.display(),
                tab
            );
        }

        Ok(())
    }

    /// Remote url and key from the file, falling back to `DONGBU_REMOTE_URL`
    /// and `DONGBU_API_KEY`.
    pub fn remote_settings(&self) -> Result<RemoteSettings> {
        let url = non_blank(self.remote.url.clone())
            .or_else(|| non_blank(env::var("DONGBU_REMOTE_URL").ok()))
            .ok_or_else(|| {
                anyhow!("no remote url configured; set [remote].url or DONGBU_REMOTE_URL")
            })?;
        validate_url(&url).context("remote url is invalid")?;
        let api_key = non_blank(self.remote.api_key.clone())
            .or_else(|| non_blank(env::var("DONGBU_API_KEY").ok()))
            .ok_or_else(|| {
                anyhow!("no api key configured; set [remote].api_key or DONGBU_API_KEY")
            })?;
        Ok(RemoteSettings {
            url,
            api_key,
            timeout: self.timeout()?,
        })
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.remote.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn car_numbers(&self) -> Vec<String> {
        self.cars
            .numbers
            .iter()
            .map(|car| car.trim().to_owned())
            .collect()
    }

    pub fn start_tab(&self) -> TabKind {
        self.ui
            .start_tab
            .as_deref()
            .and_then(TabKind::parse)
            .unwrap_or(TabKind::Board)
    }

    /// `DONGBU_LOG` wins over `[log].level`.
    pub fn log_filter(&self) -> String {
        non_blank(env::var("DONGBU_LOG").ok())
            .or_else(|| non_blank(self.log.level.clone()))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => crate::logging::default_log_path(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# dongbu config\n# Place this file at: {}\n\nversion = 1\n\n[remote]\n# Project url and anon key. DONGBU_REMOTE_URL and DONGBU_API_KEY are used when unset.\nurl = \"https://<project>.supabase.co\"\napi_key = \"<anon key>\"\ntimeout = \"{}\"\n\n[cars]\nnumbers = [{}]\n\n[ui]\nstart_tab = \"board\"\n\n[log]\nlevel = \"{}\"\n# path = \"/absolute/path/dongbu.log\"\n",
            path.display(),
            DEFAULT_TIMEOUT,
            DEFAULT_CARS
                .iter()
                .map(|car| format!("\"{car}\""))
                .collect::<Vec<_>>()
                .join(", "),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn validate_url(raw: &str) -> Result<()> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        bail!("{trimmed:?} must start with http:// or https://");
    }
    if trimmed.trim_end_matches('/').ends_with("://") {
        bail!("{trimmed:?} has no host");
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
