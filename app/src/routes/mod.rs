pub mod swift_code;

use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use infra::{
    AppState,
    http::{
        handler::{health_check, metrics},
        middleware::track_metrics,
    },
};

use crate::routes::swift_code::create_swift_code_routes;

/// ルーターを作成する。
///
/// # 引数
///
/// * `app_state`: アプリケーションの状態
pub fn create_router(app_state: AppState) -> Router {
    axum::Router::new()
        .route("/health-check", get(health_check))
        .route("/metrics", get(metrics))
        .nest("/v1/swift-codes", create_swift_code_routes(app_state.clone()))
        .route_layer(from_fn_with_state(app_state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
