use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod geo;
pub mod merchants;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{
    haversine_distance_meters, BoundingBox, GeoError, GeoPoint, ServiceArea,
    DEFAULT_SEARCH_RADIUS_METERS, MAX_SEARCH_RADIUS_METERS,
};
pub use merchants::{load_merchant_config, MerchantConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read merchant config at {path}: {reason}")]
    MerchantFile { path: String, reason: String },
    #[error("failed to parse merchant config at {path}: {reason}")]
    MerchantParse { path: String, reason: String },
    #[error("invalid merchant config: {0}")]
    Validation(String),
}
