use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::ChartScale;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteSettings,
    pub readings: ReadingsConfig,
    pub chart: ChartConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    /// JSON file holding the per-device site configuration
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingsConfig {
    pub enabled: bool,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout_seconds: u64,
    pub poll_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    pub min_power_margin_w: f64,
    pub min_voltage_margin_v: f64,
}

impl ChartConfig {
    pub fn scale(&self) -> ChartScale {
        ChartScale {
            min_power_margin_w: self.min_power_margin_w,
            min_voltage_margin_v: self.min_voltage_margin_v,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("DROOP__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}
