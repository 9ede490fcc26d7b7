use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::resolver::DEFAULT_CITY;

pub const DEFAULT_BASE_URL: &str = "https://opendata.cwa.gov.tw/api";

/// 36-hour general forecast dataset.
pub const DEFAULT_DATASET: &str = "F-C0032-001";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "CWA-XXXX"
/// default_city = "臺北市"
/// geoip_db = "/var/lib/GeoIP/GeoLite2-City.mmdb"
///
/// [city_names]
/// hualien = "花蓮縣"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CWA open data authorization key.
    pub api_key: Option<String>,
    pub base_url: String,
    pub dataset: String,
    /// Outbound request timeout in seconds; 0 disables it. Requests are never retried.
    pub timeout_secs: u64,

    /// City used when the caller's IP cannot be resolved.
    pub default_city: String,
    /// Extra lowercase-English → administrative name entries, merged over the built-in table.
    pub city_names: HashMap<String, String>,
    /// Path to a GeoLite2-City database. Without it every IP resolves to `default_city`.
    pub geoip_db: Option<PathBuf>,

    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Honour `X-Forwarded-For` / `X-Real-IP` when determining the caller's IP.
    pub trust_proxy_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            timeout_secs: 30,
            default_city: DEFAULT_CITY.to_string(),
            city_names: HashMap::new(),
            geoip_db: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            trust_proxy_headers: true,
        }
    }
}

impl Config {
    /// Load config from the platform config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("CWA_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("CWA_BASE_URL") {
            self.base_url = url;
        }
        if let Some(path) = non_empty("CWA_GEOIP_DB") {
            self.geoip_db = Some(PathBuf::from(path));
        }
        if let Some(city) = non_empty("CWA_DEFAULT_CITY") {
            self.default_city = city;
        }
        if let Some(host) = non_empty("HOST") {
            self.host = host;
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(env) = non_empty("APP_ENV") {
            self.environment = env;
        }
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("tw", "cwa-weather", "cwa-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
