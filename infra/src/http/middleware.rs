use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// ルートに一致しなかったリクエストのパスラベル
const UNMATCHED_PATH: &str = "unmatched";

/// リクエスト数と処理時間を記録するミドルウェア
pub async fn track_metrics(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| String::from(UNMATCHED_PATH));
    let method = request.method().clone();
    let started_at = Instant::now();

    let response = next.run(request).await;

    app_state.metrics.observe_request(
        method.as_str(),
        &path,
        response.status(),
        started_at.elapsed(),
    );
    response
}
