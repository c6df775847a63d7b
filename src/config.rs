use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings, read from `ROOMBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_file: PathBuf,
    /// JSON room list; the built-in rooms are used when unset.
    pub catalog_file: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("bookings.json"),
            catalog_file: None,
            metrics_port: None,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset or blank variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(path) = get("ROOMBOOK_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        config.catalog_file = get("ROOMBOOK_CATALOG").map(PathBuf::from);
        if let Some(port) = get("ROOMBOOK_METRICS_PORT") {
            config.metrics_port = Some(parse("ROOMBOOK_METRICS_PORT", &port)?);
        }
        if let Some(secs) = get("ROOMBOOK_SWEEP_SECS") {
            let secs: u64 = parse("ROOMBOOK_SWEEP_SECS", &secs)?;
            config.sweep_interval = Duration::from_secs(secs.max(1));
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
