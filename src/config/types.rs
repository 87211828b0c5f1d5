use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::server::ServerConfig;
use crate::error::ConfigError;
use crate::query::QueryConfig;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PROMETRICS_CONFIG";
/// Prefix of environment variables overriding individual settings.
/// Nested keys are separated by `__`, e.g. `PROMETRICS_SERVER__BIND_ADDRESS`.
pub const ENV_PREFIX: &str = "PROMETRICS_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus HTTP API used by the query client. Absent disables it.
    #[serde(default)]
    pub query: Option<QueryConfig>,
}

/// Default figment: the YAML file (path from `PROMETRICS_CONFIG` if set)
/// overlaid with `PROMETRICS_`-prefixed environment variables.
pub fn default_figment() -> Figment {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
}

/// Extracts a configuration from any figment.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, ConfigError> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
    // handle configuration migration between versions here when necessary
}

/// Load config from the default figment.
pub fn load_config() -> Result<ConfigV1, ConfigError> {
    load_config_from(default_figment())
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
