// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use csvview_app::{ChartKind, DEFAULT_LOADING_DELAY, PlotsOptions, StalePolicy};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub charts: Charts,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            server: Server::default(),
            charts: Charts::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
    pub max_upload_size: Option<i64>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            db_path: None,
            max_upload_size: Some(csvview_store::MAX_UPLOAD_SIZE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charts {
    pub loading_delay: Option<String>,
    pub stale_updates: Option<String>,
    pub default_plot: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CSVVIEW_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CSVVIEW_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(csvview_store::APP_NAME);
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
                    "config file {} is not versioned. Add `version = 1` and put values under [storage], [server], [charts], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate it with `csvview --print-example-config`",
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
        if let Some(db_path) = &self.storage.db_path {
            csvview_store::validate_db_path(db_path)?;
        }

        if let Some(max_size) = self.storage.max_upload_size
            && max_size <= 0
        {
            bail!(
                "storage.max_upload_size in {} must be positive, got {}",
                path.display(),
                max_size
            );
        }

        if let Some(base_url) = &self.server.base_url
            && base_url.trim_end_matches('/').is_empty()
        {
            bail!(
                "server.base_url in {} must not be empty; use e.g. {DEFAULT_BASE_URL}",
                path.display()
            );
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(delay) = &self.charts.loading_delay {
            parse_duration(delay).with_context(|| {
                format!("charts.loading_delay in {} is invalid", path.display())
            })?;
        }

        if let Some(policy) = &self.charts.stale_updates
            && StalePolicy::parse(policy).is_none()
        {
            bail!(
                "charts.stale_updates in {} must be \"apply\" or \"latest\", got {policy:?}",
                path.display()
            );
        }

        if let Some(plot) = &self.charts.default_plot
            && ChartKind::parse(plot).is_none()
        {
            let labels: Vec<&str> = ChartKind::ALL.iter().map(|kind| kind.as_str()).collect();
            bail!(
                "charts.default_plot in {} must be one of {}; got {plot:?}",
                path.display(),
                labels.join(", ")
            );
        }

        if let Some(level) = &self.log.level
            && level.parse::<log::LevelFilter>().is_err()
        {
            bail!(
                "log.level in {} must be one of off, error, warn, info, debug, trace; got {level:?}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => csvview_store::default_db_path(),
        }
    }

    pub fn max_upload_size(&self) -> i64 {
        self.storage
            .max_upload_size
            .unwrap_or(csvview_store::MAX_UPLOAD_SIZE)
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn plots_options(&self) -> Result<PlotsOptions> {
        let loading_delay = match &self.charts.loading_delay {
            Some(raw) => parse_duration(raw)?,
            None => DEFAULT_LOADING_DELAY,
        };
        let stale_policy = self
            .charts
            .stale_updates
            .as_deref()
            .and_then(StalePolicy::parse)
            .unwrap_or_default();
        let default_plot = self
            .charts
            .default_plot
            .as_deref()
            .and_then(ChartKind::parse)
            .unwrap_or(ChartKind::Table);
        Ok(PlotsOptions {
            default_plot,
            loading_delay,
            stale_policy,
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file to a writable path")
        })?;
        let app_dir = data_root.join(csvview_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create data directory {}", app_dir.display()))?;
        Ok(app_dir.join("csvview.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# csvview config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/csvview/csvview.db)\n# db_path = \"/absolute/path/to/csvview.db\"\nmax_upload_size = {}\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[charts]\nloading_delay = \"200ms\"\n# \"apply\" runs every delayed update; \"latest\" keeps only the newest per chart\nstale_updates = \"apply\"\ndefault_plot = \"Table\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/csvview.log\"\n",
            path.display(),
            csvview_store::MAX_UPLOAD_SIZE,
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 200ms or 5s)")
}
