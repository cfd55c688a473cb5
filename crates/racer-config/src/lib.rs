//! Racer configuration loading and validation (`config.json` / `config.toml`).

pub mod config;
pub mod validate;

pub use config::{
    ConfigFormat, DEFAULT_CONFIG_PATH, DEFAULT_INFO_URL, DEFAULT_RESERVE_URL, EndpointsConfig,
    RacerConfig, RacingConfig,
};
pub use validate::validate_config;
