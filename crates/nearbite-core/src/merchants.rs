use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, ServiceArea, MAX_SEARCH_RADIUS_METERS};
use crate::ConfigError;

fn default_true() -> bool {
    true
}

/// One merchant entry in the seed YAML file.
///
/// Coordinates are optional — a merchant can be onboarded before its
/// outlet is geocoded. Ungeocoded merchants are excluded from every
/// geospatial query until both values are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    pub outlet_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_accepting_orders: bool,
    /// Optional service-area ring as `[lat, lon]` pairs.
    pub service_area: Option<Vec<[f64; 2]>>,
}

impl MerchantConfig {
    /// Generate a URL-safe slug from the outlet name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.outlet_name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct MerchantsFile {
    pub merchants: Vec<MerchantConfig>,
}

/// Load and validate the merchant seed configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_merchant_config(path: &Path) -> Result<Vec<MerchantConfig>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MerchantFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let file: MerchantsFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::MerchantParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    validate_merchants(&file)?;

    Ok(file.merchants)
}

fn validate_merchants(file: &MerchantsFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for merchant in &file.merchants {
        if merchant.outlet_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "merchant outlet_name must be non-empty".to_string(),
            ));
        }

        let slug = merchant.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate merchant slug: {slug}"
            )));
        }

        match (merchant.latitude, merchant.longitude) {
            (Some(lat), Some(lon)) => {
                GeoPoint::new(lat, lon).map_err(|e| {
                    ConfigError::Validation(format!("merchant {slug}: {e}"))
                })?;
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "merchant {slug}: latitude and longitude must both be set or both be absent"
                )));
            }
        }

        if merchant.delivery_radius_meters <= 0
            || f64::from(merchant.delivery_radius_meters) > MAX_SEARCH_RADIUS_METERS
        {
            return Err(ConfigError::Validation(format!(
                "merchant {slug}: delivery_radius_meters must be in (0, {MAX_SEARCH_RADIUS_METERS}]"
            )));
        }

        if let Some(eta) = merchant.estimated_delivery_time_minutes {
            if eta <= 0 {
                return Err(ConfigError::Validation(format!(
                    "merchant {slug}: estimated_delivery_time_minutes must be positive"
                )));
            }
        }

        if let Some(ring) = &merchant.service_area {
            let value = serde_json::to_value(ring).map_err(|e| {
                ConfigError::Validation(format!("merchant {slug}: service_area: {e}"))
            })?;
            ServiceArea::from_json(&value).map_err(|e| {
                ConfigError::Validation(format!("merchant {slug}: service_area: {e}"))
            })?;
        }
    }

    Ok(())
}
