//! RFC-7807 problem details responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::middleware::CorrelationId;
use crate::domain::foundation::GatewayError;

/// RFC-7807 error body returned for every surfaced failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: String,
    title: String,
    status: u16,
    detail: String,
    correlation_id: String,
}

impl ProblemDetails {
    /// Creates a problem body.
    pub fn new(
        status: StatusCode,
        title: impl Into<String>,
        detail: impl Into<String>,
        correlation_id: &CorrelationId,
    ) -> Self {
        Self {
            problem_type: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            correlation_id: correlation_id.as_str().to_string(),
        }
    }

    /// Maps a gateway error to its problem body.
    ///
    /// Validation, token-limit, and model-resolution failures are the
    /// caller's fault (400); chain exhaustion is 503; everything else is a
    /// 500 whose detail stays generic.
    pub fn from_error(error: &GatewayError, correlation_id: &CorrelationId) -> Self {
        match error {
            GatewayError::Validation(_)
            | GatewayError::TokenLimitExceeded { .. }
            | GatewayError::ModelUnknown(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "Invalid request",
                error.to_string(),
                correlation_id,
            ),
            GatewayError::AllProvidersFailed { attempted } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable",
                format!("All providers failed ({} models attempted)", attempted.len()),
                correlation_id,
            ),
            GatewayError::UpstreamTerminal { .. }
            | GatewayError::Cancelled
            | GatewayError::Internal(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "The request could not be completed",
                correlation_id,
            ),
        }
    }

    /// The HTTP status this body carries.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ModelId, ValidationError};

    fn correlation() -> CorrelationId {
        CorrelationId::new("test-correlation")
    }

    #[test]
    fn validation_maps_to_400() {
        let error = GatewayError::Validation(ValidationError::empty_field("messages"));
        let problem = ProblemDetails::from_error(&error, &correlation());
        assert_eq!(problem.status, 400);
        assert_eq!(problem.correlation_id, "test-correlation");
    }

    #[test]
    fn token_limit_maps_to_400() {
        let error = GatewayError::TokenLimitExceeded {
            estimated: 300_000,
            limit: 200_000,
        };
        let problem = ProblemDetails::from_error(&error, &correlation());
        assert_eq!(problem.status, 400);
        assert!(problem.detail.contains("300000"));
    }

    #[test]
    fn chain_exhaustion_maps_to_503() {
        let error = GatewayError::AllProvidersFailed {
            attempted: vec![ModelId::new("a/x").unwrap()],
        };
        let problem = ProblemDetails::from_error(&error, &correlation());
        assert_eq!(problem.status, 503);
        assert!(problem.detail.contains("All providers failed"));
    }

    #[test]
    fn internal_failures_keep_detail_generic() {
        let error = GatewayError::Internal("connection pool exhausted".to_string());
        let problem = ProblemDetails::from_error(&error, &correlation());
        assert_eq!(problem.status, 500);
        assert!(!problem.detail.contains("pool"));
    }

    #[test]
    fn serializes_camel_case() {
        let problem = ProblemDetails::new(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "bad",
            &correlation(),
        );
        let json = serde_json::to_string(&problem).unwrap();
        assert!(json.contains("\"correlationId\":\"test-correlation\""));
        assert!(json.contains("\"status\":400"));
        assert!(json.contains("\"type\":\"about:blank\""));
    }
}
