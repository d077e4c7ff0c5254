//! Route composition — one `Router` wired to `AppState`, mirroring the
//! teacher's `create_router` shape in `api/routes.rs` but flattened: this
//! core has no optional sub-routers, every endpoint is always present.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::openapi::ApiDoc;
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/candles", get(handlers::candles_fixed))
        .route("/api/v1/candles/smart", get(handlers::candles_smart))
        .route("/api/v1/candles/lazy", get(handlers::candles_lazy))
        .route("/api/v1/candles/explain", get(handlers::candles_explain))
        .route("/api/v1/symbols", get(handlers::symbols))
        .route("/api/v1/timeframes", get(handlers::timeframes))
        .route("/api/v1/data/range", get(handlers::data_range))
        .route("/api/v1/data/check", get(handlers::data_check))
        .route("/api/v1/data/ensure", post(handlers::data_ensure))
        .route("/api/v1/data/status", get(handlers::data_status))
        .route("/api/v1/data/jobs/status", get(handlers::job_status))
        .route("/api/v1/stats", get(handlers::stats))
        .route("/api/v1/stats/cache", get(handlers::stats_cache))
        .route("/api/v1/contract", get(handlers::contract))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
