use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
};
use serde::{Deserialize, Serialize};

use domain::{
    DomainError, DomainResult,
    models::{
        Address, BankName, CountryIso2, CountryName, CountrySwiftCodes, SwiftCode,
        SwiftCodeDetail, SwiftCodeRecord,
    },
};
use use_case::swift_code::CacheStatus;

use super::swift_code_use_case;
use crate::{
    AppState,
    http::{ApiError, ApiResult},
};

pub const SWIFT_CODE_CREATED_MESSAGE: &str = "SWIFT code created successfully";
pub const SWIFT_CODE_DELETED_MESSAGE: &str = "SWIFT code deleted successfully";

/// 読み取り結果をキャッシュから取得したか（`HIT`または`MISS`）を示すヘッダ
///
/// キャッシュが無効な場合は付与しない。
pub const CACHE_STATUS_HEADER: &str = "x-swift-cache";

/// SWIFTコード登録リクエストボディ
///
/// `isHeadquarter`は受け付けるが、本店であるかどうかはSWIFTコードから導出する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftCodeRequestBody {
    pub swift_code: String,
    pub bank_name: String,
    pub address: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    pub country_name: String,
    pub is_headquarter: bool,
}

impl TryFrom<SwiftCodeRequestBody> for SwiftCodeRecord {
    type Error = DomainError;

    fn try_from(body: SwiftCodeRequestBody) -> DomainResult<Self> {
        Ok(SwiftCodeRecord::new(
            SwiftCode::new(body.swift_code)?,
            BankName::new(body.bank_name)?,
            Address::new(body.address)?,
            CountryIso2::new(body.country_iso2)?,
            CountryName::new(body.country_name)?,
        ))
    }
}

/// SWIFTコードレスポンスボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftCodeResponseBody {
    pub swift_code: String,
    pub bank_name: String,
    pub address: String,
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    pub country_name: String,
    pub is_headquarter: bool,
}

impl From<SwiftCodeRecord> for SwiftCodeResponseBody {
    fn from(record: SwiftCodeRecord) -> Self {
        Self {
            swift_code: record.swift_code.0,
            bank_name: record.bank_name.0,
            address: record.address.0,
            country_iso2: record.country_iso2.0,
            country_name: record.country_name.0,
            is_headquarter: record.is_headquarter,
        }
    }
}

/// SWIFTコード詳細レスポンスボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftCodeDetailResponseBody {
    #[serde(flatten)]
    pub swift_code: SwiftCodeResponseBody,
    pub branches: Vec<SwiftCodeResponseBody>,
}

impl From<SwiftCodeDetail> for SwiftCodeDetailResponseBody {
    fn from(detail: SwiftCodeDetail) -> Self {
        Self {
            swift_code: detail.record.into(),
            branches: detail.branches.into_iter().map(Into::into).collect(),
        }
    }
}

/// 国別SWIFTコードレスポンスボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySwiftCodesResponseBody {
    #[serde(rename = "countryISO2")]
    pub country_iso2: String,
    pub country_name: String,
    pub swift_codes: Vec<SwiftCodeResponseBody>,
}

impl From<CountrySwiftCodes> for CountrySwiftCodesResponseBody {
    fn from(country: CountrySwiftCodes) -> Self {
        Self {
            country_iso2: country.country_iso2.0,
            country_name: country.country_name.0,
            swift_codes: country.swift_codes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponseBody {
    pub message: String,
}

impl MessageResponseBody {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// キャッシュの参照結果を記録して、レスポンスヘッダを返す。
fn cache_status_headers(app_state: &AppState, status: CacheStatus) -> HeaderMap {
    app_state.metrics.observe_cache(status);
    let mut headers = HeaderMap::new();
    if let Some(value) = status.header_value() {
        headers.insert(
            HeaderName::from_static(CACHE_STATUS_HEADER),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// SWIFTコード取得ハンドラ
#[tracing::instrument(skip(app_state))]
pub async fn by_code(
    State(app_state): State<AppState>,
    Path(swift_code): Path<String>,
) -> ApiResult<(HeaderMap, Json<SwiftCodeDetailResponseBody>)> {
    let swift_code = SwiftCode::new(swift_code).map_err(ApiError::from)?;
    let use_case = swift_code_use_case(&app_state);
    let (detail, status) = use_case.by_code(&swift_code).await.map_err(ApiError::from)?;
    Ok((cache_status_headers(&app_state, status), Json(detail.into())))
}

/// 国別SWIFTコード取得ハンドラ
#[tracing::instrument(skip(app_state))]
pub async fn by_country(
    State(app_state): State<AppState>,
    Path(country_iso2): Path<String>,
) -> ApiResult<(HeaderMap, Json<CountrySwiftCodesResponseBody>)> {
    let country_iso2 = CountryIso2::new(country_iso2).map_err(ApiError::from)?;
    let use_case = swift_code_use_case(&app_state);
    let (country, status) = use_case
        .by_country(&country_iso2)
        .await
        .map_err(ApiError::from)?;
    Ok((cache_status_headers(&app_state, status), Json(country.into())))
}

/// SWIFTコード登録ハンドラ
#[tracing::instrument(skip(app_state, request_body))]
pub async fn create(
    State(app_state): State<AppState>,
    request_body: Result<Json<SwiftCodeRequestBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponseBody>)> {
    let Json(request_body) = request_body?;
    let requested_headquarter = request_body.is_headquarter;
    let record = SwiftCodeRecord::try_from(request_body).map_err(ApiError::from)?;
    if requested_headquarter != record.is_headquarter {
        tracing::debug!(
            "isHeadquarter of {} was overridden by the value derived from the code",
            record.swift_code
        );
    }

    let use_case = swift_code_use_case(&app_state);
    use_case.create(record).await.map_err(ApiError::from)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponseBody::new(SWIFT_CODE_CREATED_MESSAGE)),
    ))
}

/// SWIFTコード削除ハンドラ
#[tracing::instrument(skip(app_state))]
pub async fn delete(
    State(app_state): State<AppState>,
    Path(swift_code): Path<String>,
) -> ApiResult<Json<MessageResponseBody>> {
    let swift_code = SwiftCode::new(swift_code).map_err(ApiError::from)?;
    let use_case = swift_code_use_case(&app_state);
    let deleted = use_case.delete(&swift_code).await.map_err(ApiError::from)?;
    tracing::info!("{} SWIFT code(s) deleted", deleted.len());
    Ok(Json(MessageResponseBody::new(SWIFT_CODE_DELETED_MESSAGE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_body(swift_code: &str, is_headquarter: bool) -> SwiftCodeRequestBody {
        SwiftCodeRequestBody {
            swift_code: swift_code.to_string(),
            bank_name: String::from(" Bank HQ "),
            address: String::from("Warsaw"),
            country_iso2: String::from("pl"),
            country_name: String::from("Poland"),
            is_headquarter,
        }
    }

    #[test]
    fn request_body_uses_wire_field_names() -> anyhow::Result<()> {
        let json = r#"{
            "swiftCode": "BANKPLPWXXX",
            "bankName": "Bank HQ",
            "address": "Warsaw",
            "countryISO2": "PL",
            "countryName": "POLAND",
            "isHeadquarter": true
        }"#;
        let body: SwiftCodeRequestBody = serde_json::from_str(json)?;
        assert_eq!(body.swift_code, "BANKPLPWXXX");
        assert_eq!(body.country_iso2, "PL");
        assert!(body.is_headquarter);

        Ok(())
    }

    #[test]
    fn request_body_requires_all_fields() {
        let json = r#"{"swiftCode": "BANKPLPWXXX", "bankName": "Bank HQ"}"#;
        assert!(serde_json::from_str::<SwiftCodeRequestBody>(json).is_err());
    }

    #[rstest::rstest]
    #[case("bankplpwxxx", false, true)]
    #[case("BANKPLPW001", true, false)]
    fn headquarter_flag_is_derived_from_the_code(
        #[case] swift_code: &str,
        #[case] requested: bool,
        #[case] expected: bool,
    ) -> anyhow::Result<()> {
        let record = SwiftCodeRecord::try_from(request_body(swift_code, requested))?;
        assert_eq!(record.is_headquarter, expected);
        assert_eq!(record.swift_code.0, swift_code.to_uppercase());
        assert_eq!(record.bank_name.0, "Bank HQ");
        assert_eq!(record.country_iso2.0, "PL");
        assert_eq!(record.country_name.0, "POLAND");

        Ok(())
    }

    #[test]
    fn detail_response_uses_wire_field_names() -> anyhow::Result<()> {
        let headquarter = SwiftCodeRecord::try_from(request_body("BANKPLPWXXX", true))?;
        let branch = SwiftCodeRecord::try_from(request_body("BANKPLPW001", false))?;
        let body = SwiftCodeDetailResponseBody::from(SwiftCodeDetail {
            record: headquarter,
            branches: vec![branch],
        });
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["swiftCode"], "BANKPLPWXXX");
        assert_eq!(value["bankName"], "Bank HQ");
        assert_eq!(value["countryISO2"], "PL");
        assert_eq!(value["countryName"], "POLAND");
        assert_eq!(value["isHeadquarter"], true);
        assert_eq!(value["branches"][0]["swiftCode"], "BANKPLPW001");
        assert_eq!(value["branches"][0]["isHeadquarter"], false);
        assert!(value["branches"][0].get("branches").is_none());

        let decoded: SwiftCodeDetailResponseBody = serde_json::from_value(value)?;
        assert_eq!(decoded, body);

        Ok(())
    }

    #[test]
    fn country_response_uses_wire_field_names() -> anyhow::Result<()> {
        let record = SwiftCodeRecord::try_from(request_body("BANKPLPWXXX", true))?;
        let body = CountrySwiftCodesResponseBody::from(CountrySwiftCodes {
            country_iso2: record.country_iso2.clone(),
            country_name: record.country_name.clone(),
            swift_codes: vec![record],
        });
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["countryISO2"], "PL");
        assert_eq!(value["countryName"], "POLAND");
        assert_eq!(value["swiftCodes"][0]["swiftCode"], "BANKPLPWXXX");

        Ok(())
    }
}
