//! Plain (non-geospatial) read operations for the `merchants` table.

use sqlx::PgPool;

use super::types::MerchantRow;
use crate::DbError;

const MERCHANT_COLUMNS: &str = "id, public_id, slug, outlet_name, \
     latitude, longitude, is_active, is_accepting_orders, \
     delivery_radius_meters, estimated_delivery_time_minutes, \
     created_at, updated_at";

/// List all active merchants, ordered by `outlet_name ASC`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_active_merchants(pool: &PgPool) -> Result<Vec<MerchantRow>, sqlx::Error> {
    sqlx::query_as::<_, MerchantRow>(&format!(
        "SELECT {MERCHANT_COLUMNS} \
         FROM merchants \
         WHERE is_active = TRUE \
         ORDER BY outlet_name ASC"
    ))
    .fetch_all(pool)
    .await
}

/// Fetch a single merchant by slug.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no merchant has that slug, or
/// [`DbError::Sqlx`] on query failure.
pub async fn get_merchant_by_slug(pool: &PgPool, slug: &str) -> Result<MerchantRow, DbError> {
    sqlx::query_as::<_, MerchantRow>(&format!(
        "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
