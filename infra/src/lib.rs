pub mod http;
pub mod postgres;
pub mod redis;

use std::sync::Arc;

use settings::AppSettings;
use use_case::swift_code::CacheGeneration;

use crate::http::metrics::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    pub app_settings: AppSettings,
    pub pg_pool: sqlx::PgPool,
    /// キャッシュが無効、またはRedisに接続できなかった場合は`None`
    pub redis_pool: Option<deadpool_redis::Pool>,
    /// キャッシュを破棄した世代
    pub cache_generation: CacheGeneration,
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    /// キャッシュの世代とメトリクスを初期化して、アプリケーションの状態を作成する。
    pub fn new(
        app_settings: AppSettings,
        pg_pool: sqlx::PgPool,
        redis_pool: Option<deadpool_redis::Pool>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            app_settings,
            pg_pool,
            redis_pool,
            cache_generation: CacheGeneration::default(),
            metrics: Arc::new(HttpMetrics::new()?),
        })
    }
}
