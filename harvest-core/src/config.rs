use crate::error::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "harvest.toml";
pub const SECRETS_PATH_ENV: &str = "REDDIT_SECRETS_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    pub name: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub query: String,
    pub forums: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_search_output")]
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_combined_file")]
    pub combined_file: String,
    #[serde(default = "default_forums")]
    pub forums: Vec<ForumConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
}

fn default_limit() -> u32 {
    100
}

fn default_search_output() -> String {
    "keyword_posts.csv".to_string()
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from("reddit_api.env")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_combined_file() -> String {
    "combined_posts.csv".to_string()
}

fn default_forums() -> Vec<ForumConfig> {
    ["technology", "science", "worldnews"]
        .into_iter()
        .map(|name| ForumConfig {
            name: name.to_string(),
            limit: default_limit(),
        })
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secrets_path: default_secrets_path(),
            output_dir: default_output_dir(),
            combined_file: default_combined_file(),
            forums: default_forums(),
            search: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let config: AppConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            info!(
                "No configuration at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies the secrets-path environment override, if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(SECRETS_PATH_ENV) {
            if !path.trim().is_empty() {
                self.secrets_path = PathBuf::from(path);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for forum in &self.forums {
            if forum.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "forums.name".to_string(),
                    value: forum.name.clone(),
                });
            }
            if forum.limit == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("forums.{}.limit", forum.name),
                    value: "0".to_string(),
                });
            }
        }

        if let Some(search) = &self.search {
            if search.query.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "search.query".to_string(),
                });
            }
            if search.forums.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "search.forums".to_string(),
                });
            }
            if search.limit == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "search.limit".to_string(),
                    value: "0".to_string(),
                });
            }
        }

        if self.combined_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "combined_file".to_string(),
            });
        }

        Ok(())
    }

    pub fn forum_output(&self, forum: &str) -> PathBuf {
        self.output_dir.join(format!("{}_posts.csv", forum))
    }

    pub fn combined_output(&self) -> PathBuf {
        self.output_dir.join(&self.combined_file)
    }
}
