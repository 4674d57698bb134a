use std::time::Duration;

use serde::Serialize;

use domain::{
    models::{SwiftCode, SwiftCodeRecord},
    repositories::SwiftCodeRepository as _,
};
use infra::{AppState, postgres::repositories::PgSwiftCodeRepository};
use settings::AppSettings;

use crate::helpers::{ServerHandle, TestApp, configure_test_app, spawn_app};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether to print the tracing logs of the application server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableTracing {
    Yes,
    No,
}

/// Test case for integration tests
pub struct TestCase {
    pub app_state: AppState,
    server: ServerHandle,
    pub http_client: reqwest::Client,
}

impl TestCase {
    pub async fn begin(app_settings: AppSettings, enable_tracing: EnableTracing) -> Self {
        if enable_tracing == EnableTracing::Yes {
            let subscriber = app::get_subscriber(
                "test_suite".into(),
                app_settings.log.level,
                std::io::stdout,
            );
            // Another test case may have already installed the subscriber
            let _ = app::init_subscriber(subscriber);
        }
        let TestApp {
            app_state,
            listener,
        } = configure_test_app(app_settings).await;
        let server = spawn_app(app_state.clone(), listener);
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap();
        Self {
            app_state,
            server,
            http_client,
        }
    }

    pub async fn end(self) {
        self.server.stop();
    }

    pub fn origin(&self) -> String {
        format!(
            "{}://{}:{}",
            self.app_state.app_settings.http.protocol,
            self.app_state.app_settings.http.host,
            self.app_state.app_settings.http.port,
        )
    }

    /// Returns the record stored in the database, bypassing the cache
    pub async fn stored_record(&self, code: &str) -> Option<SwiftCodeRecord> {
        let repo = PgSwiftCodeRepository::new(self.app_state.pg_pool.clone());
        let code = SwiftCode::new(code.to_string()).unwrap();
        repo.by_code(&code).await.unwrap()
    }

    /// Returns the parent code stored in the database
    pub async fn stored_parent_code(&self, code: &str) -> Option<String> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT parent_code FROM swift_codes WHERE swift_code = $1",
        )
        .bind(code)
        .fetch_one(&self.app_state.pg_pool)
        .await
        .unwrap()
    }

    pub async fn health_check(&self) -> reqwest::Response {
        let uri = format!("{}/health-check", self.origin());
        self.http_client.get(&uri).send().await.unwrap()
    }

    pub async fn metrics(&self) -> reqwest::Response {
        let uri = format!("{}/metrics", self.origin());
        self.http_client.get(&uri).send().await.unwrap()
    }

    pub async fn create_swift_code(&self, body: &RawSwiftCodeRequestBody) -> reqwest::Response {
        let uri = format!("{}/v1/swift-codes", self.origin());
        self.http_client.post(&uri).json(body).send().await.unwrap()
    }

    pub async fn swift_code(&self, code: &str) -> reqwest::Response {
        let uri = format!("{}/v1/swift-codes/{}", self.origin(), code);
        self.http_client.get(&uri).send().await.unwrap()
    }

    pub async fn country_swift_codes(&self, country_iso2: &str) -> reqwest::Response {
        let uri = format!("{}/v1/swift-codes/country/{}", self.origin(), country_iso2);
        self.http_client.get(&uri).send().await.unwrap()
    }

    pub async fn delete_swift_code(&self, code: &str) -> reqwest::Response {
        let uri = format!("{}/v1/swift-codes/{}", self.origin(), code);
        self.http_client.delete(&uri).send().await.unwrap()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSwiftCodeRequestBody {
    pub swift_code: String,
    pub bank_name: String,
    pub address: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    pub country_name: String,
    pub is_headquarter: bool,
}

impl RawSwiftCodeRequestBody {
    pub fn new(swift_code: &str, bank_name: &str, country_iso2: &str, country_name: &str) -> Self {
        Self {
            swift_code: swift_code.to_string(),
            bank_name: bank_name.to_string(),
            address: format!("{} street 1", bank_name),
            country_iso2: country_iso2.to_string(),
            country_name: country_name.to_string(),
            is_headquarter: swift_code.ends_with("XXX"),
        }
    }
}
