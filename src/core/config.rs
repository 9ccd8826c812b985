use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub valuation: Option<EndpointConfig>,
    pub holdings: Option<EndpointConfig>,
    pub quotes: Option<EndpointConfig>,
    pub search: Option<EndpointConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            valuation: Some(EndpointConfig {
                base_url: "https://fundgz.1234567.com.cn".to_string(),
            }),
            holdings: Some(EndpointConfig {
                base_url: "https://fundf10.eastmoney.com".to_string(),
            }),
            quotes: Some(EndpointConfig {
                base_url: "https://qt.gtimg.cn".to_string(),
            }),
            search: Some(EndpointConfig {
                base_url: "https://fund.eastmoney.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fnav", "fnav")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "fnav", "fnav")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn valuation_base_url(&self) -> &str {
        self.providers
            .valuation
            .as_ref()
            .map_or("https://fundgz.1234567.com.cn", |p| &p.base_url)
    }

    pub fn holdings_base_url(&self) -> &str {
        self.providers
            .holdings
            .as_ref()
            .map_or("https://fundf10.eastmoney.com", |p| &p.base_url)
    }

    pub fn quotes_base_url(&self) -> &str {
        self.providers
            .quotes
            .as_ref()
            .map_or("https://qt.gtimg.cn", |p| &p.base_url)
    }

    pub fn search_base_url(&self) -> &str {
        self.providers
            .search
            .as_ref()
            .map_or("https://fund.eastmoney.com", |p| &p.base_url)
    }
}
