use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const CONFIG_FILE: &str = "kira-sm.json";
pub const TOKEN_ENV: &str = "KIRA_SM_API_TOKEN";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub workers: usize,
    pub language_tag: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config = match Self::locate(path) {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| KiraError::ConfigParse(err.to_string()))?
            }
            None if overrides.base_url.is_some() => Config::default(),
            None => return Err(KiraError::MissingConfig),
        };

        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self::resolve_config(config, overrides, token)
    }

    fn locate(path: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("org", "kira", "kira-sample-metadata")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .filter(|candidate| candidate.exists())
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
        env_token: Option<String>,
    ) -> Result<ResolvedConfig, KiraError> {
        let base_url = overrides
            .base_url
            .or(config.base_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| KiraError::ConfigParse("base_url is required".to_string()))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(KiraError::ConfigParse(format!(
                "base_url must be an http(s) URL: {base_url}"
            )));
        }

        let workers = overrides
            .workers
            .or(config.workers)
            .unwrap_or(default_workers());
        if workers == 0 {
            return Err(KiraError::ConfigParse(
                "workers must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            base_url,
            api_token: env_token.or(config.api_token),
            timeout_secs: overrides
                .timeout_secs
                .or(config.timeout_secs)
                .unwrap_or(default_timeout_secs()),
            workers,
            language_tag: config.language_tag.unwrap_or_else(|| "en-US".to_string()),
        })
    }
}

pub fn default_workers() -> usize {
    8
}

pub fn default_timeout_secs() -> u64 {
    30
}
