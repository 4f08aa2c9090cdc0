pub mod config;
pub mod error;

pub use config::{
    Config, GeocodingConfig, PhotosConfig, SearchConfig, StorageConfig, UnitSystem,
    ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError, WeatherError};

use anyhow::Result;

/// Initialize logging with an `info` default filter
pub fn init() -> Result<()> {
    init_with_default_filter("info")
}

/// Initialize logging. `RUST_LOG` wins over `default_filter` when set.
pub fn init_with_default_filter(default_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("citycast core initialized");
    Ok(())
}
