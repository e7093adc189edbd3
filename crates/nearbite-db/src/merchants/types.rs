//! Row types for the `merchants` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A full row from the `merchants` table.
///
/// Coordinates are `NUMERIC(9,6)` in the schema and come back as
/// [`Decimal`]; geospatial queries cast them to `float8` instead and use
/// [`MerchantDistanceRow`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MerchantRow {
    pub id: i64,
    pub public_id: Uuid,
    pub slug: String,
    pub outlet_name: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A merchant hit from a proximity query, with the computed great-circle
/// distance. Coordinates are non-null by construction — the query filters
/// ungeocoded rows out.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MerchantDistanceRow {
    pub id: i64,
    pub public_id: Uuid,
    pub slug: String,
    pub outlet_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
    pub distance_meters: f64,
}

/// A service-area candidate: a distance row plus the raw `service_area`
/// JSONB, which the finder evaluates application-side.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MerchantCandidateRow {
    pub id: i64,
    pub public_id: Uuid,
    pub slug: String,
    pub outlet_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
    pub distance_meters: f64,
    pub service_area: Option<serde_json::Value>,
}

impl MerchantCandidateRow {
    /// Drop the polygon payload once containment has been decided.
    #[must_use]
    pub fn into_distance_row(self) -> MerchantDistanceRow {
        MerchantDistanceRow {
            id: self.id,
            public_id: self.public_id,
            slug: self.slug,
            outlet_name: self.outlet_name,
            latitude: self.latitude,
            longitude: self.longitude,
            is_active: self.is_active,
            is_accepting_orders: self.is_accepting_orders,
            delivery_radius_meters: self.delivery_radius_meters,
            estimated_delivery_time_minutes: self.estimated_delivery_time_minutes,
            distance_meters: self.distance_meters,
        }
    }
}
