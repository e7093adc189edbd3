//! Offline unit tests for nearbite-db pool configuration and row types.
//! These tests do not require a live database connection.

use nearbite_core::{AppConfig, Environment};
use nearbite_db::{MerchantDistanceRow, MerchantRow, Page, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        merchants_path: PathBuf::from("./config/merchants.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`MerchantRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn merchant_row_has_expected_fields() {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    let row = MerchantRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        slug: "adobo-corner".to_string(),
        outlet_name: "Adobo Corner".to_string(),
        latitude: Some(Decimal::new(14_599_500, 6)),
        longitude: Some(Decimal::new(121_024_400, 6)),
        is_active: true,
        is_accepting_orders: false,
        delivery_radius_meters: 5_000,
        estimated_delivery_time_minutes: Some(35),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.slug, "adobo-corner");
    assert!(row.is_active);
    assert!(!row.is_accepting_orders);
    assert_eq!(row.delivery_radius_meters, 5_000);
    assert_eq!(row.estimated_delivery_time_minutes, Some(35));
}

/// Compile-time smoke test for [`MerchantDistanceRow`].
#[test]
fn merchant_distance_row_has_expected_fields() {
    use uuid::Uuid;

    let row = MerchantDistanceRow {
        id: 42_i64,
        public_id: Uuid::new_v4(),
        slug: "sisig-station".to_string(),
        outlet_name: "Sisig Station".to_string(),
        latitude: 14.5547,
        longitude: 121.0244,
        is_active: true,
        is_accepting_orders: true,
        delivery_radius_meters: 3_000,
        estimated_delivery_time_minutes: None,
        distance_meters: 1_234.5,
    };

    assert_eq!(row.id, 42);
    assert!(row.distance_meters > 0.0);
    assert!(row.estimated_delivery_time_minutes.is_none());
}

#[test]
fn page_accessors_reflect_clamped_values() {
    let page = Page::new(250, 30);
    assert_eq!(page.limit(), 100);
    assert_eq!(page.offset(), 30);
}
