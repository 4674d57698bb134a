use std::time::Duration;

use reqwest::StatusCode;

use infra::http::handler::swift_code::{
    CACHE_STATUS_HEADER, CountrySwiftCodesResponseBody, MessageResponseBody,
    SWIFT_CODE_CREATED_MESSAGE, SWIFT_CODE_DELETED_MESSAGE, SwiftCodeDetailResponseBody,
};

use crate::{
    helpers::{ResponseParts, load_app_settings_for_testing, split_response},
    test_case::{EnableTracing, RawSwiftCodeRequestBody, TestCase},
};

fn headquarter() -> RawSwiftCodeRequestBody {
    RawSwiftCodeRequestBody::new("BANKPLPWXXX", "Bank HQ", "PL", "POLAND")
}

fn branch() -> RawSwiftCodeRequestBody {
    RawSwiftCodeRequestBody::new("BANKPLPW001", "Bank Branch", "PL", "POLAND")
}

async fn create(test_case: &TestCase, body: &RawSwiftCodeRequestBody) {
    let response = test_case.create_swift_code(body).await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::CREATED, "{}", body);
    let message = serde_json::from_str::<MessageResponseBody>(&body).unwrap();
    assert_eq!(message.message, SWIFT_CODE_CREATED_MESSAGE);
}

async fn detail(test_case: &TestCase, code: &str) -> SwiftCodeDetailResponseBody {
    let response = test_case.swift_code(code).await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK, "{}", body);
    serde_json::from_str::<SwiftCodeDetailResponseBody>(&body).unwrap()
}

fn detail_of(body: &str) -> String {
    let value = serde_json::from_str::<serde_json::Value>(body).unwrap();
    value["detail"].as_str().unwrap().to_string()
}

/// Check that a created SWIFT code can be fetched with the same field values.
#[tokio::test]
#[ignore]
async fn created_swift_code_can_be_fetched() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let mut body = headquarter();
    body.swift_code = String::from("bankplpwxxx");
    body.country_iso2 = String::from("pl");
    body.country_name = String::from("Poland");
    create(&test_case, &body).await;

    let detail = detail(&test_case, "BANKPLPWXXX").await;
    assert_eq!(detail.swift_code.swift_code, "BANKPLPWXXX");
    assert_eq!(detail.swift_code.bank_name, "Bank HQ");
    assert_eq!(detail.swift_code.address, "Bank HQ street 1");
    assert_eq!(detail.swift_code.country_iso2, "PL");
    assert_eq!(detail.swift_code.country_name, "POLAND");
    assert!(detail.swift_code.is_headquarter);
    assert!(detail.branches.is_empty());

    // The path is normalized as well
    let detail = self::detail(&test_case, "bankplpwxxx").await;
    assert_eq!(detail.swift_code.swift_code, "BANKPLPWXXX");

    test_case.end().await;
}

/// Check that the headquarter flag is derived from the code regardless of the request.
#[tokio::test]
#[ignore]
async fn headquarter_flag_is_derived_from_the_code() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let mut body = branch();
    body.is_headquarter = true;
    create(&test_case, &body).await;

    let detail = detail(&test_case, "BANKPLPW001").await;
    assert!(!detail.swift_code.is_headquarter);
    let record = test_case.stored_record("BANKPLPW001").await.unwrap();
    assert!(!record.is_headquarter);

    test_case.end().await;
}

/// Check that the headquarter lists its branches and the country lists all of them.
#[tokio::test]
#[ignore]
async fn headquarter_lists_its_branches() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(&test_case, &headquarter()).await;
    create(&test_case, &branch()).await;
    create(
        &test_case,
        &RawSwiftCodeRequestBody::new("OTHRDEFFXXX", "Other HQ", "DE", "GERMANY"),
    )
    .await;
    assert_eq!(
        test_case.stored_parent_code("BANKPLPW001").await.as_deref(),
        Some("BANKPLPWXXX")
    );

    let detail = detail(&test_case, "BANKPLPWXXX").await;
    assert_eq!(detail.branches.len(), 1);
    assert_eq!(detail.branches[0].swift_code, "BANKPLPW001");
    assert_eq!(detail.branches[0].bank_name, "Bank Branch");
    assert!(!detail.branches[0].is_headquarter);

    let detail = self::detail(&test_case, "BANKPLPW001").await;
    assert!(detail.branches.is_empty());

    let response = test_case.country_swift_codes("pl").await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK, "{}", body);
    let country = serde_json::from_str::<CountrySwiftCodesResponseBody>(&body).unwrap();
    assert_eq!(country.country_iso2, "PL");
    assert_eq!(country.country_name, "POLAND");
    let mut codes = country
        .swift_codes
        .iter()
        .map(|code| code.swift_code.as_str())
        .collect::<Vec<_>>();
    codes.sort();
    assert_eq!(codes, vec!["BANKPLPW001", "BANKPLPWXXX"]);

    test_case.end().await;
}

/// Check that a headquarter created after its branch adopts the branch.
#[tokio::test]
#[ignore]
async fn headquarter_created_later_adopts_its_branches() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(&test_case, &branch()).await;
    assert_eq!(test_case.stored_parent_code("BANKPLPW001").await, None);
    create(&test_case, &headquarter()).await;
    assert_eq!(
        test_case.stored_parent_code("BANKPLPW001").await.as_deref(),
        Some("BANKPLPWXXX")
    );

    let detail = detail(&test_case, "BANKPLPWXXX").await;
    assert_eq!(detail.branches.len(), 1);

    test_case.end().await;
}

/// Check that an 8-character code ending in `XXX` is a headquarter that owns its branches.
#[tokio::test]
#[ignore]
async fn eight_character_headquarter_owns_its_branches() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(
        &test_case,
        &RawSwiftCodeRequestBody::new("ABCDEXXX001", "Early Branch", "PL", "POLAND"),
    )
    .await;
    create(
        &test_case,
        &RawSwiftCodeRequestBody::new("ABCDEXXX", "Short HQ", "PL", "POLAND"),
    )
    .await;
    create(
        &test_case,
        &RawSwiftCodeRequestBody::new("ABCDEXXX002", "Late Branch", "PL", "POLAND"),
    )
    .await;
    for code in ["ABCDEXXX001", "ABCDEXXX002"] {
        assert_eq!(
            test_case.stored_parent_code(code).await.as_deref(),
            Some("ABCDEXXX")
        );
    }

    let detail = detail(&test_case, "ABCDEXXX").await;
    assert!(detail.swift_code.is_headquarter);
    let mut branches = detail
        .branches
        .iter()
        .map(|branch| branch.swift_code.as_str())
        .collect::<Vec<_>>();
    branches.sort();
    assert_eq!(branches, vec!["ABCDEXXX001", "ABCDEXXX002"]);

    let response = test_case.delete_swift_code("ABCDEXXX").await;
    assert_eq!(response.status(), StatusCode::OK);
    for code in ["ABCDEXXX001", "ABCDEXXX002"] {
        assert!(test_case.stored_record(code).await.is_none());
    }

    test_case.end().await;
}

/// Check that a headquarter created while a branch insert is still open adopts the branch.
#[tokio::test]
#[ignore]
async fn headquarter_created_during_branch_insert_adopts_the_branch() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;
    let pool = test_case.app_state.pg_pool.clone();

    // A branch insert that has already found no headquarter and has not committed yet
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind("BANKPLPW")
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query(
        r#"
        INSERT INTO swift_codes (
            swift_code, institution_code, bank_name, address,
            country_iso2, country_name, is_headquarter, parent_code
        )
        VALUES ('BANKPLPW001', 'BANKPLPW', 'Bank Branch', 'Bank Branch street 1',
            'PL', 'POLAND', FALSE, NULL)
        "#,
    )
    .execute(&mut *tx)
    .await
    .unwrap();

    let client = test_case.http_client.clone();
    let uri = format!("{}/v1/swift-codes", test_case.origin());
    let headquarter_insert =
        tokio::spawn(async move { client.post(&uri).json(&headquarter()).send().await });

    // Wait until the headquarter insert blocks on the same institution
    let mut waiting = 0;
    for _ in 0..100 {
        waiting = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM pg_locks WHERE locktype = 'advisory' AND NOT granted",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        if waiting > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(waiting, 1);
    tx.commit().await.unwrap();

    let response = headquarter_insert.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        test_case.stored_parent_code("BANKPLPW001").await.as_deref(),
        Some("BANKPLPWXXX")
    );

    test_case.end().await;
}

/// Check that reads report whether they were answered from the cache.
#[tokio::test]
#[ignore]
async fn reads_report_the_cache_status() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;
    let cache_status = |response: &reqwest::Response| {
        response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .map(|value| value.to_str().unwrap().to_string())
    };

    create(&test_case, &headquarter()).await;
    let first = test_case.swift_code("BANKPLPWXXX").await;
    let second = test_case.swift_code("BANKPLPWXXX").await;
    let country = test_case.country_swift_codes("PL").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(country.status(), StatusCode::OK);

    if test_case.app_state.redis_pool.is_none() {
        // Running without Redis
        assert_eq!(cache_status(&first), None);
        assert_eq!(cache_status(&second), None);
        assert_eq!(cache_status(&country), None);
        test_case.end().await;
        return;
    }
    assert_eq!(cache_status(&first).as_deref(), Some("MISS"));
    assert_eq!(cache_status(&second).as_deref(), Some("HIT"));
    assert_eq!(cache_status(&country).as_deref(), Some("MISS"));

    // A new branch invalidates its headquarter and its country
    create(&test_case, &branch()).await;
    let response = test_case.swift_code("BANKPLPWXXX").await;
    assert_eq!(cache_status(&response).as_deref(), Some("MISS"));
    let response = test_case.country_swift_codes("PL").await;
    assert_eq!(cache_status(&response).as_deref(), Some("MISS"));

    let response = test_case.metrics().await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK, "{}", body);
    assert!(body.contains(r#"swift_codes_cache_lookups_total{result="hit"} 1"#));
    assert!(body.contains(r#"swift_codes_cache_lookups_total{result="miss"} 4"#));

    test_case.end().await;
}

/// Check that a duplicated SWIFT code is rejected.
#[tokio::test]
#[ignore]
async fn duplicated_swift_code_is_rejected() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(&test_case, &headquarter()).await;
    let mut body = headquarter();
    body.bank_name = String::from("Another Bank");
    let response = test_case.create_swift_code(&body).await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::CONFLICT, "{}", body);
    assert!(detail_of(&body).contains("already exists"));

    // The first record is kept
    let record = test_case.stored_record("BANKPLPWXXX").await.unwrap();
    assert_eq!(record.bank_name.0, "Bank HQ");

    test_case.end().await;
}

/// Check that an invalid request body is rejected.
#[tokio::test]
#[ignore]
async fn invalid_request_body_is_rejected() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let mut body = headquarter();
    body.swift_code = String::from("BANKPL");
    let response = test_case.create_swift_code(&body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut body = headquarter();
    body.bank_name = String::from("  ");
    let response = test_case.create_swift_code(&body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("{}/v1/swift-codes", test_case.origin());
    let response = test_case
        .http_client
        .post(&uri)
        .json(&serde_json::json!({"swiftCode": "BANKPLPWXXX"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(test_case.stored_record("BANKPLPWXXX").await.is_none());

    test_case.end().await;
}

/// Check that deleting a headquarter also deletes its branches.
#[tokio::test]
#[ignore]
async fn deleting_headquarter_deletes_its_branches() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(&test_case, &headquarter()).await;
    create(&test_case, &branch()).await;
    // Cache the detail and the country before deleting
    detail(&test_case, "BANKPLPWXXX").await;
    detail(&test_case, "BANKPLPW001").await;
    test_case.country_swift_codes("PL").await;

    let response = test_case.delete_swift_code("BANKPLPWXXX").await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK, "{}", body);
    let message = serde_json::from_str::<MessageResponseBody>(&body).unwrap();
    assert_eq!(message.message, SWIFT_CODE_DELETED_MESSAGE);

    for code in ["BANKPLPWXXX", "BANKPLPW001"] {
        assert!(test_case.stored_record(code).await.is_none());
        let response = test_case.swift_code(code).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    let response = test_case.country_swift_codes("PL").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    test_case.end().await;
}

/// Check that deleting a branch keeps its headquarter.
#[tokio::test]
#[ignore]
async fn deleting_branch_keeps_its_headquarter() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    create(&test_case, &headquarter()).await;
    create(&test_case, &branch()).await;
    let detail = detail(&test_case, "BANKPLPWXXX").await;
    assert_eq!(detail.branches.len(), 1);

    let response = test_case.delete_swift_code("BANKPLPW001").await;
    assert_eq!(response.status(), StatusCode::OK);

    let detail = self::detail(&test_case, "BANKPLPWXXX").await;
    assert!(detail.branches.is_empty());
    assert!(test_case.stored_record("BANKPLPW001").await.is_none());

    test_case.end().await;
}

/// Check that unknown SWIFT codes and countries are not found.
#[tokio::test]
#[ignore]
async fn unknown_swift_code_is_not_found() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case.swift_code("NOPEPLPWXXX").await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::NOT_FOUND, "{}", body);
    assert_eq!(detail_of(&body), "SWIFT code not found");

    let response = test_case.delete_swift_code("NOPEPLPWXXX").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test_case.country_swift_codes("ZZ").await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::NOT_FOUND, "{}", body);
    assert_eq!(detail_of(&body), "No SWIFT codes found for this country");

    test_case.end().await;
}
