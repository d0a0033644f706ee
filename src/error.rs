//! API error type and its mapping onto the failure envelope
//!
//! Every failure of a fetch handler ends up here and is rendered as
//! `{ success: false, error, message }` with the matching HTTP status.

use crate::config::Credential;
use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 500 - credential absent from the environment
    #[error("{} is not configured", .0.env_var())]
    MissingCredential(Credential),

    /// 400 - district name not in the LAWD table
    #[error("invalid district: {0}")]
    InvalidDistrict(String),

    /// 400 - region not in the R-ONE region table
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// 400 - required query parameters absent
    #[error("missing parameters: {0}")]
    MissingParameters(&'static str),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidDistrict(_)
            | ApiError::InvalidRegion(_)
            | ApiError::MissingParameters(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(UpstreamError::NotActivated) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable error label clients can switch on
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::MissingCredential(_) => "API key not configured",
            ApiError::InvalidDistrict(_) => "Invalid district",
            ApiError::InvalidRegion(_) => "Invalid region",
            ApiError::MissingParameters(_) => "Missing parameters",
            ApiError::Upstream(UpstreamError::NotActivated) => "API not activated",
            ApiError::Upstream(UpstreamError::Rejected(_)) => "API error",
            ApiError::Upstream(UpstreamError::InvalidJson { .. }) => "Invalid response",
            ApiError::Upstream(_) => "API request failed",
        }
    }

    /// Human readable message, displayed verbatim by the dashboard
    pub fn message(&self) -> String {
        match self {
            ApiError::MissingCredential(credential) => {
                format!("{} 환경변수를 설정해주세요.", credential.env_var())
            }
            ApiError::InvalidDistrict(_) => "유효하지 않은 구 이름입니다.".to_string(),
            ApiError::InvalidRegion(_) => "유효하지 않은 지역입니다.".to_string(),
            ApiError::MissingParameters(detail) => detail.to_string(),
            ApiError::Upstream(UpstreamError::NotActivated) => {
                "API 키가 아직 활성화되지 않았습니다. 공공데이터포털 승인 후 최대 1시간 소요될 수 있습니다. 잠시 후 다시 시도해주세요."
                    .to_string()
            }
            ApiError::Upstream(UpstreamError::Rejected(msg)) => msg.clone(),
            ApiError::Upstream(UpstreamError::InvalidJson { snippet }) => {
                format!("응답 파싱 실패: {}", snippet)
            }
            ApiError::Upstream(e) => e.to_string(),
        }
    }
}

/// JSON body of a failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            success: false,
            error: self.label().to_string(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential() {
        let err = ApiError::MissingCredential(Credential::Neis);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.label(), "API key not configured");
        assert!(err.message().contains("NEIS_API_KEY"));
    }

    #[test]
    fn test_validation_errors_are_400() {
        assert_eq!(
            ApiError::InvalidDistrict("없는구".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidRegion("달".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MissingParameters("시군구코드와 법정동코드는 필수입니다.").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_activated_is_503() {
        let err = ApiError::from(UpstreamError::NotActivated);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.label(), "API not activated");
    }

    #[test]
    fn test_upstream_failures_are_500() {
        let status = ApiError::from(UpstreamError::Status(502));
        assert_eq!(status.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status.label(), "API request failed");

        let parse = ApiError::from(UpstreamError::InvalidJson {
            snippet: "<html>".into(),
        });
        assert_eq!(parse.label(), "Invalid response");
        assert_eq!(parse.message(), "응답 파싱 실패: <html>");

        let rejected = ApiError::from(UpstreamError::Rejected("SERVICE KEY IS NOT REGISTERED".into()));
        assert_eq!(rejected.label(), "API error");
        assert_eq!(rejected.message(), "SERVICE KEY IS NOT REGISTERED");
    }
}
