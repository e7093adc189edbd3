mod merchants;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use nearbite_db::{FinderError, ProximityFinder};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub finder: ProximityFinder,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let finder = ProximityFinder::new(pool.clone());
        Self { pool, finder }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Translate a finder failure into the API error envelope.
///
/// Validation failures carry their message to the caller; store failures
/// are logged in full but surfaced with a generic message so connection
/// details never leak.
pub(super) fn map_finder_error(request_id: String, error: &FinderError) -> ApiError {
    match error {
        FinderError::InvalidCoordinate { .. } | FinderError::InvalidRadius { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        FinderError::Store(e) => {
            tracing::error!(error = %e, "proximity query failed");
            ApiError::new(request_id, "store_unavailable", "merchant store unavailable")
        }
    }
}

pub(super) fn map_db_error(request_id: String, error: &nearbite_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "store_unavailable", "merchant store unavailable")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/merchants", get(merchants::list_merchants))
        .route(
            "/api/v1/merchants/nearby",
            get(merchants::list_merchants_nearby),
        )
        .route(
            "/api/v1/merchants/deliverable",
            get(merchants::list_merchants_deliverable),
        )
        .route(
            "/api/v1/merchants/service-area",
            get(merchants::list_merchants_in_service_area),
        )
        // Static segments above win over the capture, so reserved path
        // names never resolve as slugs.
        .route("/api/v1/merchants/{slug}", get(merchants::get_merchant))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match nearbite_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_store_unavailable_maps_to_503() {
        let response =
            ApiError::new("req-2", "store_unavailable", "merchant store unavailable")
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn map_finder_error_keeps_validation_detail() {
        let err = FinderError::InvalidRadius {
            radius_meters: 60_000.0,
        };
        let api_err = map_finder_error("req-3".to_string(), &err);
        assert_eq!(api_err.error.code, "validation_error");
        assert!(api_err.error.message.contains("60000"));
    }

    async fn seed_merchant(pool: &sqlx::PgPool, slug: &str, lat: f64, lon: f64) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO merchants \
                 (slug, outlet_name, latitude, longitude, delivery_radius_meters) \
             VALUES ($1, $2, $3, $4, 5000) RETURNING id",
        )
        .bind(slug)
        .bind(format!("Outlet {slug}"))
        .bind(lat)
        .bind(lon)
        .fetch_one(pool)
        .await
        .expect("seed merchant")
    }

    async fn get_json(
        app: Router,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        build_app(AppState::new(pool), auth, default_rate_limit_state())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok(pool: sqlx::PgPool) {
        let (status, json) = get_json(test_app(pool), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_merchants_returns_active_rows(pool: sqlx::PgPool) {
        seed_merchant(&pool, "list-test", 14.6, 121.0).await;

        let (status, json) = get_json(test_app(pool), "/api/v1/merchants").await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"].as_str(), Some("list-test"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_merchant_returns_detail_by_slug(pool: sqlx::PgPool) {
        seed_merchant(&pool, "detail-test", 14.6, 121.0).await;

        let (status, json) = get_json(test_app(pool), "/api/v1/merchants/detail-test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["slug"].as_str(), Some("detail-test"));
        assert_eq!(json["data"]["delivery_radius_meters"].as_i64(), Some(5000));
        assert!(
            (json["data"]["latitude"].as_f64().unwrap() - 14.6).abs() < 1e-6,
            "latitude should round-trip through NUMERIC"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_merchant_returns_404_for_unknown_slug(pool: sqlx::PgPool) {
        let (status, json) =
            get_json(test_app(pool), "/api/v1/merchants/nonexistent-slug-xyz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_returns_distance_annotated_hits(pool: sqlx::PgPool) {
        // ~1.1km north of the query origin.
        seed_merchant(&pool, "nearby-test", 14.6095, 121.0244).await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/merchants/nearby?latitude=14.5995&longitude=121.0244&radius=5000",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        let hit = &data[0];
        assert_eq!(hit["slug"].as_str(), Some("nearby-test"));
        let distance = hit["distance_meters"].as_f64().expect("distance_meters");
        assert!(
            (1_000.0..1_300.0).contains(&distance),
            "expected ~1.1km, got {distance}"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_rejects_out_of_range_latitude(pool: sqlx::PgPool) {
        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/merchants/nearby?latitude=99.0&longitude=121.0",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_rejects_oversized_radius(pool: sqlx::PgPool) {
        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/merchants/nearby?latitude=14.6&longitude=121.0&radius=60000",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearby_rejects_non_numeric_latitude(pool: sqlx::PgPool) {
        let response = test_app(pool)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/merchants/nearby?latitude=invalid&longitude=121.0")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deliverable_excludes_paused_merchants(pool: sqlx::PgPool) {
        let id = seed_merchant(&pool, "paused-test", 14.6, 121.0).await;
        sqlx::query("UPDATE merchants SET is_accepting_orders = FALSE WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await
            .expect("pause merchant");

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/merchants/deliverable?latitude=14.6&longitude=121.0",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn service_area_route_returns_ok(pool: sqlx::PgPool) {
        seed_merchant(&pool, "sa-route-test", 14.6, 121.0).await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/merchants/service-area?latitude=14.6&longitude=121.0",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["slug"].as_str(), Some("sa-route-test"));
    }
}
