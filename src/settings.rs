use std::env;
use std::net;
use std::path::Path;

use config::{
    builder::{ConfigBuilder, DefaultState},
    Config, ConfigError, Environment, File,
};
use serde::{Deserialize, Serialize};

use crate::storage::RecordEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub dns_address: net::IpAddr,
    pub dns_port: u16,

    #[serde(default)]
    pub authoritative: bool,

    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = defaults()?
            .add_source(File::with_name("/etc/zonekeeper/config.toml").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("zonekeeper"))
            .build()?;

        config.try_deserialize()
    }

    /// Loads the defaults overlaid with a single settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from(path))
            .build()?;

        config.try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("dns_address", "0.0.0.0")?
        .set_default("dns_port", 53_i64)?
        .set_default("authoritative", false)
}
