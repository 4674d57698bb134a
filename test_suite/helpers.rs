//! Helpers for the integration tests
//!
//! Every test case runs the HTTP server against its own PostgreSQL database,
//! named `test_swift_db_<uuid>` (hyphens in the UUID replaced by underscores),
//! which is created on the PostgreSQL server configured in `app_settings.toml`.
//!
//! Cached values are stored under the key prefix `test-swift-cache-<uuid>`,
//! so test cases sharing the Redis never see each other's values.
//! When the Redis is not reachable, the server runs without the cache.
//!
//! [NOTICE]
//!
//! The test databases are not dropped automatically.
//! Drop the databases whose names start with `test_swift_db_` after running the tests.
use std::{path::PathBuf, thread::JoinHandle};

use sqlx::{Connection as _, Executor as _, PgConnection, PgPool};
use tokio::{net::TcpListener, sync::oneshot};

use app::{bind_address, connect_cache, load_app_settings, migrate_database, routes::create_router};
use infra::AppState;
use settings::{AppSettings, DatabaseSettings};

pub const TEST_DATABASE_PREFIX: &str = "test_swift_db_";
pub const TEST_CACHE_PREFIX: &str = "test-swift-cache-";

/// Loads `app_settings.toml` at the workspace root
pub fn load_app_settings_for_testing() -> AppSettings {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
    let path: PathBuf = [manifest_dir.as_str(), "..", "app_settings.toml"]
        .iter()
        .collect();
    load_app_settings(path.to_str().expect("the path must be UTF-8"))
        .expect("failed to load app_settings.toml")
}

/// Application state with a listener bound to a free port
pub struct TestApp {
    pub app_state: AppState,
    pub listener: TcpListener,
}

pub async fn configure_test_app(mut app_settings: AppSettings) -> TestApp {
    let id = uuid::Uuid::new_v4();

    app_settings.database.name = format!("{}{}", TEST_DATABASE_PREFIX, id).replace('-', "_");
    let pg_pool = create_test_database(&app_settings.database).await;

    app_settings.redis.key_prefix = format!("{}{}", TEST_CACHE_PREFIX, id);
    let redis_pool = connect_cache(&app_settings.redis).await;

    // Let the OS choose the port
    app_settings.http.port = 0;
    let (listener, port) = bind_address(&app_settings.http).await.unwrap();
    app_settings.http.port = port;

    TestApp {
        app_state: AppState::new(app_settings, pg_pool, redis_pool)
            .expect("failed to register the metrics"),
        listener,
    }
}

/// Creates the test database and the `swift_codes` table in it
async fn create_test_database(settings: &DatabaseSettings) -> PgPool {
    let maintenance = DatabaseSettings {
        name: String::from("postgres"),
        ..settings.clone()
    };
    let mut conn = PgConnection::connect_with(&maintenance.connect_options())
        .await
        .unwrap();
    conn.execute(format!(r#"CREATE DATABASE "{}";"#, settings.name).as_str())
        .await
        .unwrap();
    conn.close().await.unwrap();

    let pool = PgPool::connect_with(settings.connect_options())
        .await
        .unwrap();
    migrate_database(&pool).await.unwrap();
    pool
}

/// Handle of the HTTP server running in a dedicated thread
pub struct ServerHandle {
    thread: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl ServerHandle {
    /// Stops the server gracefully and waits for the thread to finish
    pub fn stop(self) {
        _ = self.shutdown.send(());
        self.thread.join().unwrap();
    }
}

/// Starts the HTTP server on a runtime owned by a dedicated thread
pub fn spawn_app(app_state: AppState, listener: TcpListener) -> ServerHandle {
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    let thread = std::thread::spawn(move || {
        let router = create_router(app_state);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });
    });
    ServerHandle { thread, shutdown }
}

pub struct ResponseParts {
    /// ステータスコード
    pub status_code: reqwest::StatusCode,
    /// ボディ
    pub body: String,
}

pub async fn split_response(response: reqwest::Response) -> ResponseParts {
    ResponseParts {
        status_code: response.status(),
        body: response.text().await.unwrap(),
    }
}
