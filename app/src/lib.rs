pub mod routes;

use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment};
use deadpool_redis::{Config as RedisConfig, PoolConfig, Runtime, Timeouts};
use sqlx::postgres::PgPoolOptions;

use tokio::net::TcpListener;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt as _};

use infra::AppState;
use settings::{AppSettings, DatabaseSettings, HttpSettings, RedisSettings};

/// アプリケーション設定を読み込む。
///
/// 設定ファイルの値は、`APP__DATABASE__HOST`のような環境変数で上書きできる。
pub fn load_app_settings(path: &str) -> anyhow::Result<AppSettings> {
    let config = Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read the app_settings.toml file")?;
    config
        .try_deserialize()
        .context("The contents of the app_settings.toml file is incorrect")
}

pub async fn bind_address(settings: &HttpSettings) -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(settings.bind_address())
        .await
        .context("Failed to bind to the address for the HTTP server")?;
    let port = listener
        .local_addr()
        .context("Failed to get the port of listener")?
        .port();

    Ok((listener, port))
}

pub async fn create_pg_pool(
    settings: &DatabaseSettings,
) -> anyhow::Result<sqlx::Pool<sqlx::Postgres>> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.connection_timeout))
        .connect_with(settings.connect_options())
        .await
        .context("Failed to connect to the database")
}

/// SWIFTコードテーブルを作成する。
pub async fn migrate_database(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .context("Failed to create the swift_codes table")
}

/// Redis接続を取得するまでの待ち時間
const CACHE_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn create_redis_pool(settings: &RedisSettings) -> anyhow::Result<deadpool_redis::Pool> {
    // キャッシュを待つことでリクエストが遅延しないように、接続の待ち時間を制限
    let mut timeouts = Timeouts::default();
    timeouts.wait = Some(CACHE_TIMEOUT);
    timeouts.create = Some(CACHE_TIMEOUT);
    timeouts.recycle = Some(CACHE_TIMEOUT);
    let mut pool_config = PoolConfig::default();
    pool_config.timeouts = timeouts;
    let config = RedisConfig {
        url: Some(settings.uri()),
        connection: None,
        pool: Some(pool_config),
    };
    config
        .create_pool(Some(Runtime::Tokio1))
        .context("Failed to create Redis connection pool")
}

/// 起動時にRedisの応答を待つ時間
const CACHE_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// キャッシュに使用するRedis接続プールを作成する。
///
/// キャッシュが無効な場合、またはRedisに接続できない場合は、
/// 警告を出力してキャッシュなしで起動するために`None`を返す。
pub async fn connect_cache(settings: &RedisSettings) -> Option<deadpool_redis::Pool> {
    if !settings.enabled {
        tracing::info!("The cache is disabled");
        return None;
    }
    let pool = match create_redis_pool(settings).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Continue without the cache: {:?}", e);
            return None;
        }
    };
    match tokio::time::timeout(CACHE_PING_TIMEOUT, infra::redis::ping(&pool)).await {
        Ok(Ok(_)) => Some(pool),
        Ok(Err(e)) => {
            tracing::warn!("Continue without the cache: {}: {:?}", e, e.source);
            None
        }
        Err(_) => {
            tracing::warn!("Continue without the cache: the redis did not respond");
            None
        }
    }
}

/// アプリケーションの状態を構築する。
///
/// データベースに接続してテーブルを作成し、キャッシュに接続する。
pub async fn build_app_state(app_settings: AppSettings) -> anyhow::Result<AppState> {
    let pg_pool = create_pg_pool(&app_settings.database).await?;
    migrate_database(&pg_pool).await?;
    let redis_pool = connect_cache(&app_settings.redis).await;
    AppState::new(app_settings, pg_pool, redis_pool).context("Failed to register the metrics")
}

pub fn get_subscriber<Sink>(
    name: String,
    log_level: log::Level,
    sink: Sink,
) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> anyhow::Result<()> {
    LogTracer::init().context("Failed to set logger")?;
    set_global_default(subscriber).context("Failed to set subscriber")
}

#[cfg(test)]
mod tests {
    use settings::HttpProtocol;

    use super::*;

    #[test]
    fn bundled_app_settings_can_be_loaded() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../app_settings.toml");
        let app_settings = load_app_settings(path).unwrap();
        assert_eq!(app_settings.http.protocol, HttpProtocol::Http);
        assert_eq!(app_settings.http.port, 8000);
        assert_eq!(app_settings.database.name, "swift_db");
        assert!(app_settings.redis.enabled);
        assert_eq!(app_settings.log.level, log::Level::Info);
    }
}
