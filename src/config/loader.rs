use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::AvailabilityPolicy;
use crate::models::Category;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpertConfig {
    pub name: String,
    pub category: Category,
}

impl ExpertConfig {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Yaml,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub store: StoreKind,
    #[serde(default = "Config::default_experts")]
    pub experts: Vec<ExpertConfig>,
    #[serde(default)]
    pub availability: AvailabilityPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            store: StoreKind::default(),
            experts: Self::default_experts(),
            availability: AvailabilityPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.unwrap_or_else(Self::default_config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn default_config_path() -> PathBuf {
        if let Some(config_path) = std::env::var_os("ROSTER_CONFIG") {
            PathBuf::from(config_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("roster")
                .join("config.yaml")
        }
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roster")
    }

    fn default_experts() -> Vec<ExpertConfig> {
        [
            ("Computing Expert 1", Category::Computing),
            ("Computing Expert 2", Category::Computing),
            ("Computing Expert 3", Category::Computing),
            ("Acoustic Expert 1", Category::Acoustic),
            ("Acoustic Expert 2", Category::Acoustic),
            ("Acoustic Expert 3", Category::Acoustic),
            ("Anthropologist 1", Category::Anthropologist),
            ("Anthropologist 2", Category::Anthropologist),
            ("Accounting Expert 1", Category::Accounting),
            ("Accounting Expert 2", Category::Accounting),
            ("Accounting Expert 3", Category::Accounting),
        ]
        .into_iter()
        .map(|(name, category)| ExpertConfig::new(name, category))
        .collect()
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_store(mut self, store: StoreKind) -> Self {
        self.store = store;
        self
    }

    /// Location of the YAML database inside `data_dir`.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("roster.yaml")
    }

    pub fn experts_in(&self, category: Category) -> impl Iterator<Item = &ExpertConfig> {
        self.experts.iter().filter(move |e| e.category == category)
    }
}
