//! Configuration file support for bmrp.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bmrp/config.toml`.

use crate::{Error, Gender, Language, Metrics, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub advice: AdviceConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Metrics pre-filled when creating a profile
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_age")]
    pub age: u32,

    #[serde(default = "default_gender")]
    pub gender: Gender,

    #[serde(default = "default_height")]
    pub height: f64,

    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            age: default_age(),
            gender: default_gender(),
            height: default_height(),
            weight: default_weight(),
        }
    }
}

impl DefaultsConfig {
    pub fn metrics(&self) -> Metrics {
        Metrics {
            age: self.age,
            gender: self.gender,
            height: self.height,
            weight: self.weight,
        }
    }
}

/// Advice service parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdviceConfig {
    #[serde(default)]
    pub language: Language,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            model: default_model(),
            image_model: default_image_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("bmrp")
}

fn default_age() -> u32 {
    30
}

fn default_gender() -> Gender {
    Gender::Male
}

fn default_height() -> f64 {
    175.0
}

fn default_weight() -> f64 {
    70.0
}

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    64
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check values serde cannot constrain
    pub fn validate(&self) -> Result<()> {
        self.defaults
            .metrics()
            .validate()
            .map_err(|e| Error::Config(format!("[defaults]: {}", e)))?;

        if !(0.0..=2.0).contains(&self.advice.temperature) {
            return Err(Error::Config(format!(
                "[advice] temperature must be between 0 and 2, got {}",
                self.advice.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.advice.top_p) {
            return Err(Error::Config(format!(
                "[advice] top_p must be between 0 and 1, got {}",
                self.advice.top_p
            )));
        }
        if self.advice.model.trim().is_empty() || self.advice.image_model.trim().is_empty() {
            return Err(Error::Config("[advice] model names must not be empty".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("bmrp").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
