use nearbite_core::MerchantConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert merchants from the seed config into the database.
///
/// Returns the number of merchants processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_merchants(pool: &PgPool, merchants: &[MerchantConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for merchant in merchants {
        let slug = merchant.slug();
        let service_area = merchant
            .service_area
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DbError::Sqlx(sqlx::Error::Encode(Box::new(e))))?;

        sqlx::query(
            "INSERT INTO merchants \
                 (slug, outlet_name, latitude, longitude, is_active, is_accepting_orders, \
                  delivery_radius_meters, estimated_delivery_time_minutes, service_area) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET \
                 outlet_name = EXCLUDED.outlet_name, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 is_active = EXCLUDED.is_active, \
                 is_accepting_orders = EXCLUDED.is_accepting_orders, \
                 delivery_radius_meters = EXCLUDED.delivery_radius_meters, \
                 estimated_delivery_time_minutes = EXCLUDED.estimated_delivery_time_minutes, \
                 service_area = EXCLUDED.service_area, \
                 updated_at = NOW()",
        )
        .bind(&slug)
        .bind(&merchant.outlet_name)
        .bind(merchant.latitude)
        .bind(merchant.longitude)
        .bind(merchant.is_active)
        .bind(merchant.is_accepting_orders)
        .bind(merchant.delivery_radius_meters)
        .bind(merchant.estimated_delivery_time_minutes)
        .bind(service_area)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
