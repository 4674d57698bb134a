pub mod handler;
pub mod metrics;
pub mod middleware;

use std::borrow::Cow;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use domain::{DomainError, DomainErrorKind};

/// API結果
pub type ApiResult<T> = Result<T, ApiError>;

/// APIエラー
#[derive(Debug)]
pub struct ApiError {
    /// HTTPステータスコード
    pub status_code: StatusCode,
    /// エラーメッセージ
    pub messages: Vec<Cow<'static, str>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "detail": self.messages.join(", "),
            "messages": self.messages,
        });
        (self.status_code, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let status_code = match error.kind {
            DomainErrorKind::Validation => StatusCode::BAD_REQUEST,
            DomainErrorKind::NotFound => StatusCode::NOT_FOUND,
            DomainErrorKind::Conflict => StatusCode::CONFLICT,
            DomainErrorKind::Repository => StatusCode::INTERNAL_SERVER_ERROR,
            DomainErrorKind::Cache => StatusCode::INTERNAL_SERVER_ERROR,
            DomainErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status_code.is_server_error() {
            tracing::error!("{:?}", error.source);
        }
        Self {
            status_code,
            messages: error.messages,
        }
    }
}

/// リクエストボディを JSON として解釈できなかった場合のエラー
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status_code: rejection.status(),
            messages: vec![rejection.body_text().into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use domain::domain_error;

    #[rstest::rstest]
    #[case(DomainErrorKind::Validation, StatusCode::BAD_REQUEST)]
    #[case(DomainErrorKind::NotFound, StatusCode::NOT_FOUND)]
    #[case(DomainErrorKind::Conflict, StatusCode::CONFLICT)]
    #[case(DomainErrorKind::Repository, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(DomainErrorKind::Cache, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(DomainErrorKind::Unexpected, StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_from_domain_error(#[case] kind: DomainErrorKind, #[case] expected: StatusCode) {
        let error = ApiError::from(domain_error(kind, "error"));
        assert_eq!(error.status_code, expected);
        assert_eq!(error.messages, vec![Cow::from("error")]);
    }

    #[tokio::test]
    async fn error_response_carries_detail() -> anyhow::Result<()> {
        let error = ApiError {
            status_code: StatusCode::NOT_FOUND,
            messages: vec!["SWIFT code not found".into()],
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["detail"], "SWIFT code not found");
        assert_eq!(body["messages"][0], "SWIFT code not found");

        Ok(())
    }
}
