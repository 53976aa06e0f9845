use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::system::process::DEFAULT_TOP_PROCESSES;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sampler: SamplerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub max_processes: usize,
    pub disk_mount_point: PathBuf,
    /// Floor for the elapsed time used as a rate denominator.
    pub min_elapsed_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            max_processes: DEFAULT_TOP_PROCESSES,
            disk_mount_point: PathBuf::from("/"),
            min_elapsed_ms: 1,
        }
    }
}

impl SamplerConfig {
    pub fn min_elapsed(&self) -> Duration {
        Duration::from_millis(self.min_elapsed_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Clamp values that would make polling meaningless.
    pub fn validated(mut self) -> Self {
        self.general.refresh_rate_ms = self.general.refresh_rate_ms.max(1);
        self.sampler.max_processes = self.sampler.max_processes.max(1);
        self.sampler.min_elapsed_ms = self.sampler.min_elapsed_ms.max(1);
        self
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hoststat").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<Config>(&contents)
            .unwrap_or_default()
            .validated(),
        Err(_) => Config::default(),
    }
}
