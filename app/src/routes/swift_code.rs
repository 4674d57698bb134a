use axum::{
    Router,
    routing::{get, post},
};

use infra::{
    AppState,
    http::handler::swift_code::{by_code, by_country, create, delete},
};

pub fn create_swift_code_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{swift_code}", get(by_code).delete(delete))
        .route("/country/{country_iso2}", get(by_country))
        .with_state(app_state)
}
