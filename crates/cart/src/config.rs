//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROCKETSHOES_API_URL` - Base URL of the catalog API
//!   (e.g., `http://localhost:3333`)
//!
//! ## Optional
//! - `ROCKETSHOES_STORAGE_PATH` - Path of the JSON file backing durable
//!   storage (default: `rocketshoes-cart.json`)

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = "rocketshoes-cart.json";

/// Errors that can occur loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// The catalog API URL is not a valid absolute URL.
    #[error("invalid {0}: {1}")]
    InvalidUrl(&'static str, #[source] url::ParseError),
}

/// Configuration for the cart library.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Base URL of the catalog API.
    pub api_base_url: Url,
    /// Path of the JSON file backing durable storage.
    pub storage_path: PathBuf,
}

impl CartConfig {
    /// Load the configuration from the environment.
    ///
    /// Reads a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if `ROCKETSHOES_API_URL` is unset or not a valid
    /// absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url = parse_api_url(
            &env::var("ROCKETSHOES_API_URL")
                .map_err(|_| ConfigError::MissingVar("ROCKETSHOES_API_URL"))?,
        )?;

        let storage_path = env::var("ROCKETSHOES_STORAGE_PATH")
            .map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);

        Ok(Self {
            api_base_url,
            storage_path,
        })
    }
}

/// Parse and validate the catalog API base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl("ROCKETSHOES_API_URL", e))
}
