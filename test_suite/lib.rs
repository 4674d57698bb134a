mod helpers;
mod swift_code;
mod test_case;

use reqwest::StatusCode;

use crate::{
    helpers::{ResponseParts, load_app_settings_for_testing, split_response},
    test_case::{EnableTracing, TestCase},
};

/// Check that the server answers the health check.
#[tokio::test]
#[ignore]
async fn health_check() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case.health_check().await;
    let ResponseParts { status_code, body } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK, "{}", body);
    assert_eq!(body, "Ok, the server is running!");

    test_case.end().await;
}
