pub mod swift_code;

use axum::{
    extract::State,
    http::{HeaderName, header},
};

use use_case::swift_code::SwiftCodeUseCase;

use crate::{
    AppState,
    http::{ApiError, ApiResult},
    postgres::repositories::PgSwiftCodeRepository,
    redis::cache::RedisSwiftCodeCache,
};

/// ヘルスチェックハンドラ
#[tracing::instrument()]
pub async fn health_check() -> &'static str {
    "Ok, the server is running!"
}

/// メトリクスハンドラ
///
/// Prometheusのテキスト形式でメトリクスを返す。
pub async fn metrics(
    State(app_state): State<AppState>,
) -> ApiResult<([(HeaderName, &'static str); 1], String)> {
    let body = app_state.metrics.encode().map_err(ApiError::from)?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

type SwiftCodeUseCaseImpl = SwiftCodeUseCase<PgSwiftCodeRepository, RedisSwiftCodeCache>;

fn swift_code_use_case(app_state: &AppState) -> SwiftCodeUseCaseImpl {
    let repo = PgSwiftCodeRepository::new(app_state.pg_pool.clone());
    let cache = app_state
        .redis_pool
        .clone()
        .map(|pool| RedisSwiftCodeCache::new(pool, &app_state.app_settings.redis));
    SwiftCodeUseCase::new(repo, cache, app_state.cache_generation.clone())
}
