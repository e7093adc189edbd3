//! Proximity queries over the `merchants` table.
//!
//! All three operations share the same shape: validate inputs before any
//! store access, prefilter candidates with a padded bounding box so the
//! coordinate index can help, apply the exact haversine predicate, then
//! order by ascending distance with ascending `id` as the tie-break so
//! pagination is stable across requests.
//!
//! The SQL mirrors [`nearbite_core::haversine_distance_meters`]: same
//! spherical radius, same `atan2` form, so application-side and SQL-side
//! distances agree within floating-point noise.

use sqlx::PgPool;
use thiserror::Error;

use nearbite_core::geo::{GeoError, GeoPoint, ServiceArea};
use nearbite_core::{BoundingBox, MAX_SEARCH_RADIUS_METERS};

use crate::merchants::{MerchantCandidateRow, MerchantDistanceRow};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Haversine angle for one merchant row, as a SQL fragment. `$1` is the
/// origin latitude, `$2` the origin longitude, both in degrees.
const HAVERSINE_SQL: &str = "power(sin(radians(latitude::float8 - $1) / 2), 2) \
     + cos(radians($1)) * cos(radians(latitude::float8)) \
     * power(sin(radians(longitude::float8 - $2) / 2), 2)";

const DISTANCE_SQL: &str =
    "2.0 * 6371000.0 * atan2(sqrt(hav), sqrt(1.0 - hav)) AS distance_meters";

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("invalid radius: {radius_meters} (must be in (0, {MAX_SEARCH_RADIUS_METERS}])")]
    InvalidRadius { radius_meters: f64 },
    #[error("merchant store unavailable: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<GeoError> for FinderError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidCoordinate {
                latitude,
                longitude,
            } => Self::InvalidCoordinate {
                latitude,
                longitude,
            },
        }
    }
}

/// Pagination window. Out-of-bounds values are clamped rather than
/// rejected, matching the API's limit-normalization policy.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    limit: i64,
    offset: i64,
}

impl Page {
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset: offset.max(0),
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}

/// Read-only proximity queries against the merchant store.
///
/// Holds an injected [`PgPool`]; no global connection state. Stateless
/// between calls, so concurrent requests share one finder freely.
#[derive(Debug, Clone)]
pub struct ProximityFinder {
    pool: PgPool,
}

impl ProximityFinder {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active merchants within `radius_meters` of the origin, nearest first.
    ///
    /// # Errors
    ///
    /// [`FinderError::InvalidCoordinate`] or [`FinderError::InvalidRadius`]
    /// on malformed input (no query is issued), [`FinderError::Store`] on
    /// database failure.
    pub async fn find_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        page: Page,
    ) -> Result<Vec<MerchantDistanceRow>, FinderError> {
        let origin = GeoPoint::new(latitude, longitude)?;
        if !(radius_meters > 0.0 && radius_meters <= MAX_SEARCH_RADIUS_METERS) {
            return Err(FinderError::InvalidRadius { radius_meters });
        }
        let bbox = BoundingBox::around(origin, radius_meters);

        let sql = format!(
            "WITH candidates AS ( \
                SELECT id, public_id, slug, outlet_name, \
                       latitude::float8 AS latitude, \
                       longitude::float8 AS longitude, \
                       is_active, is_accepting_orders, \
                       delivery_radius_meters, estimated_delivery_time_minutes, \
                       {HAVERSINE_SQL} AS hav \
                FROM merchants \
                WHERE is_active = TRUE \
                  AND latitude IS NOT NULL AND longitude IS NOT NULL \
                  AND latitude::float8 BETWEEN $4 AND $5 \
                  AND longitude::float8 BETWEEN $6 AND $7 \
             ), measured AS ( \
                SELECT id, public_id, slug, outlet_name, latitude, longitude, \
                       is_active, is_accepting_orders, \
                       delivery_radius_meters, estimated_delivery_time_minutes, \
                       {DISTANCE_SQL} \
                FROM candidates \
             ) \
             SELECT * FROM measured \
             WHERE distance_meters <= $3 \
             ORDER BY distance_meters ASC, id ASC \
             LIMIT $8 OFFSET $9"
        );

        let rows = sqlx::query_as::<_, MerchantDistanceRow>(&sql)
            .bind(origin.latitude)
            .bind(origin.longitude)
            .bind(radius_meters)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Merchants that can deliver to the origin: active, accepting orders,
    /// and within their own `delivery_radius_meters`. Nearest first.
    ///
    /// # Errors
    ///
    /// [`FinderError::InvalidCoordinate`] on malformed input,
    /// [`FinderError::Store`] on database failure.
    pub async fn find_in_delivery_radius(
        &self,
        latitude: f64,
        longitude: f64,
        page: Page,
    ) -> Result<Vec<MerchantDistanceRow>, FinderError> {
        let origin = GeoPoint::new(latitude, longitude)?;
        // delivery_radius_meters is capped at the platform maximum by the
        // schema, so a max-radius box covers every possible match.
        let bbox = BoundingBox::around(origin, MAX_SEARCH_RADIUS_METERS);

        let sql = format!(
            "WITH candidates AS ( \
                SELECT id, public_id, slug, outlet_name, \
                       latitude::float8 AS latitude, \
                       longitude::float8 AS longitude, \
                       is_active, is_accepting_orders, \
                       delivery_radius_meters, estimated_delivery_time_minutes, \
                       {HAVERSINE_SQL} AS hav \
                FROM merchants \
                WHERE is_active = TRUE \
                  AND is_accepting_orders = TRUE \
                  AND latitude IS NOT NULL AND longitude IS NOT NULL \
                  AND latitude::float8 BETWEEN $3 AND $4 \
                  AND longitude::float8 BETWEEN $5 AND $6 \
             ), measured AS ( \
                SELECT id, public_id, slug, outlet_name, latitude, longitude, \
                       is_active, is_accepting_orders, \
                       delivery_radius_meters, estimated_delivery_time_minutes, \
                       {DISTANCE_SQL} \
                FROM candidates \
             ) \
             SELECT * FROM measured \
             WHERE distance_meters <= delivery_radius_meters::float8 \
             ORDER BY distance_meters ASC, id ASC \
             LIMIT $7 OFFSET $8"
        );

        let rows = sqlx::query_as::<_, MerchantDistanceRow>(&sql)
            .bind(origin.latitude)
            .bind(origin.longitude)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Merchants whose service area covers the origin. A merchant with a
    /// valid `service_area` polygon is matched by point-in-polygon
    /// containment; one without falls back to the delivery-radius rule.
    ///
    /// Containment runs application-side, so ordering and pagination are
    /// applied here after the combined filter — not in SQL. The bounding
    /// box only prefilters radius-fallback rows: a polygon may extend past
    /// the maximum search radius, so rows with a `service_area` bypass it.
    ///
    /// # Errors
    ///
    /// [`FinderError::InvalidCoordinate`] on malformed input,
    /// [`FinderError::Store`] on database failure.
    pub async fn find_in_service_area(
        &self,
        latitude: f64,
        longitude: f64,
        page: Page,
    ) -> Result<Vec<MerchantDistanceRow>, FinderError> {
        let origin = GeoPoint::new(latitude, longitude)?;
        let bbox = BoundingBox::around(origin, MAX_SEARCH_RADIUS_METERS);

        let sql = format!(
            "WITH candidates AS ( \
                SELECT id, public_id, slug, outlet_name, \
                       latitude::float8 AS latitude, \
                       longitude::float8 AS longitude, \
                       is_active, is_accepting_orders, \
                       delivery_radius_meters, estimated_delivery_time_minutes, \
                       service_area, \
                       {HAVERSINE_SQL} AS hav \
                FROM merchants \
                WHERE is_active = TRUE \
                  AND is_accepting_orders = TRUE \
                  AND latitude IS NOT NULL AND longitude IS NOT NULL \
                  AND (service_area IS NOT NULL \
                       OR (latitude::float8 BETWEEN $3 AND $4 \
                           AND longitude::float8 BETWEEN $5 AND $6)) \
             ) \
             SELECT id, public_id, slug, outlet_name, latitude, longitude, \
                    is_active, is_accepting_orders, \
                    delivery_radius_meters, estimated_delivery_time_minutes, \
                    {DISTANCE_SQL}, service_area \
             FROM candidates \
             ORDER BY distance_meters ASC, id ASC"
        );

        let candidates = sqlx::query_as::<_, MerchantCandidateRow>(&sql)
            .bind(origin.latitude)
            .bind(origin.longitude)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(&self.pool)
            .await?;

        let rows = candidates
            .into_iter()
            .filter(|row| serves_origin(row, origin))
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .take(usize::try_from(page.limit).unwrap_or(0))
            .map(MerchantCandidateRow::into_distance_row)
            .collect();
        Ok(rows)
    }
}

/// Eligibility rule for the service-area query. Candidates arrive
/// distance-ordered from SQL, so filtering preserves the ordering.
fn serves_origin(row: &MerchantCandidateRow, origin: GeoPoint) -> bool {
    match &row.service_area {
        Some(value) => match ServiceArea::from_json(value) {
            Ok(area) => area.contains(origin),
            Err(reason) => {
                // Malformed polygon: skip the merchant rather than guess.
                tracing::warn!(
                    merchant_id = row.id,
                    slug = %row.slug,
                    %reason,
                    "rejecting malformed service_area"
                );
                false
            }
        },
        None => row.distance_meters <= f64::from(row.delivery_radius_meters),
    }
}
