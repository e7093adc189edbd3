use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use nearbite_core::DEFAULT_SEARCH_RADIUS_METERS;
use nearbite_db::{proximity::DEFAULT_PAGE_SIZE, MerchantDistanceRow, Page};

use crate::middleware::RequestId;

use super::{map_db_error, map_finder_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// A merchant hit from a proximity query, annotated with the computed
/// great-circle distance from the query origin.
#[derive(Debug, Serialize)]
pub(super) struct MerchantHit {
    pub id: i64,
    pub slug: String,
    pub outlet_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
}

impl From<MerchantDistanceRow> for MerchantHit {
    fn from(row: MerchantDistanceRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            outlet_name: row.outlet_name,
            latitude: row.latitude,
            longitude: row.longitude,
            distance_meters: row.distance_meters,
            is_active: row.is_active,
            is_accepting_orders: row.is_accepting_orders,
            delivery_radius_meters: row.delivery_radius_meters,
            estimated_delivery_time_minutes: row.estimated_delivery_time_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProximityParams {
    latitude: f64,
    longitude: f64,
    /// Search radius in meters; only the nearby route reads it.
    radius: Option<f64>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl ProximityParams {
    fn page(&self) -> Page {
        Page::new(
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            self.offset.unwrap_or(0),
        )
    }
}

fn hits(rows: Vec<MerchantDistanceRow>) -> Vec<MerchantHit> {
    rows.into_iter().map(MerchantHit::from).collect()
}

/// `GET /api/v1/merchants/nearby` — active merchants within the caller's
/// search radius, nearest first.
pub(super) async fn list_merchants_nearby(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ProximityParams>,
) -> Result<Json<ApiResponse<Vec<MerchantHit>>>, ApiError> {
    let radius = params.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_METERS);
    let rows = state
        .finder
        .find_within_radius(params.latitude, params.longitude, radius, params.page())
        .await
        .map_err(|e| map_finder_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: hits(rows),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/v1/merchants/deliverable` — merchants that can deliver to the
/// caller's location under their own delivery radius.
pub(super) async fn list_merchants_deliverable(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ProximityParams>,
) -> Result<Json<ApiResponse<Vec<MerchantHit>>>, ApiError> {
    let rows = state
        .finder
        .find_in_delivery_radius(params.latitude, params.longitude, params.page())
        .await
        .map_err(|e| map_finder_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: hits(rows),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/v1/merchants/service-area` — merchants whose configured
/// service area (polygon, or delivery radius as fallback) covers the
/// caller's location.
pub(super) async fn list_merchants_in_service_area(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ProximityParams>,
) -> Result<Json<ApiResponse<Vec<MerchantHit>>>, ApiError> {
    let rows = state
        .finder
        .find_in_service_area(params.latitude, params.longitude, params.page())
        .await
        .map_err(|e| map_finder_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: hits(rows),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct MerchantListItem {
    pub id: i64,
    pub slug: String,
    pub outlet_name: String,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
}

/// `GET /api/v1/merchants` — active merchants in name order, without any
/// geospatial annotation. Operational listing for dashboards and tooling.
pub(super) async fn list_merchants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<MerchantListItem>>>, ApiError> {
    let rows = nearbite_db::list_active_merchants(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &nearbite_db::DbError::from(e)))?;

    let data = rows
        .into_iter()
        .map(|row| MerchantListItem {
            id: row.id,
            slug: row.slug,
            outlet_name: row.outlet_name,
            is_active: row.is_active,
            is_accepting_orders: row.is_accepting_orders,
            delivery_radius_meters: row.delivery_radius_meters,
            estimated_delivery_time_minutes: row.estimated_delivery_time_minutes,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct MerchantDetail {
    pub id: i64,
    pub slug: String,
    pub outlet_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub is_accepting_orders: bool,
    pub delivery_radius_meters: i32,
    pub estimated_delivery_time_minutes: Option<i32>,
}

/// `GET /api/v1/merchants/{slug}` — a single merchant by slug, including
/// ungeocoded ones (coordinates come back null until geocoding runs).
pub(super) async fn get_merchant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<MerchantDetail>>, ApiError> {
    let row = nearbite_db::get_merchant_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| match e {
            nearbite_db::DbError::NotFound => {
                ApiError::new(req_id.0.clone(), "not_found", "merchant not found")
            }
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    let data = MerchantDetail {
        id: row.id,
        slug: row.slug,
        outlet_name: row.outlet_name,
        latitude: row.latitude.and_then(|d| d.to_f64()),
        longitude: row.longitude.and_then(|d| d.to_f64()),
        is_active: row.is_active,
        is_accepting_orders: row.is_accepting_orders,
        delivery_radius_meters: row.delivery_radius_meters,
        estimated_delivery_time_minutes: row.estimated_delivery_time_minutes,
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
