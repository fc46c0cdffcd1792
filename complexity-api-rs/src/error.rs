//! Classified failures and their HTTP representation
//!
//! Failures from the model call are mapped onto a small set of
//! [`ErrorKind`]s by an ordered rule table. The first matching rule wins;
//! nothing matching falls through to [`ErrorKind::Internal`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::llm_client::ModelError;

/// Seconds a client is asked to wait after an upstream rate limit.
pub const RETRY_AFTER_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    ConfigMissing,
    RateLimited,
    Timeout,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::BadInput => StatusCode::BAD_REQUEST,
            ErrorKind::ConfigMissing => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "INVALID_INPUT",
            ErrorKind::ConfigMissing => "CONFIG_ERROR",
            ErrorKind::RateLimited => "RATE_LIMIT_EXCEEDED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Upstream => "UPSTREAM_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "Invalid input",
            ErrorKind::ConfigMissing => "Configuration Error",
            ErrorKind::RateLimited => "Rate Limit Exceeded",
            ErrorKind::Timeout => "Gateway Timeout",
            ErrorKind::Upstream => "Service Unavailable",
            ErrorKind::Internal => "Analysis Failed",
        }
    }

    /// Message shown to clients in place of the underlying error text
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "The request payload is invalid.",
            ErrorKind::ConfigMissing => "API service is not properly configured",
            ErrorKind::RateLimited => "Gemini API rate limit exceeded. Please try again later.",
            ErrorKind::Timeout => "Analysis took too long. Please try with shorter code.",
            ErrorKind::Upstream => "Gemini API is temporarily unavailable. Please try again later.",
            ErrorKind::Internal => "Unable to analyze the code. Please try again.",
        }
    }
}

/// Failure of an analysis, tagged with the category that selects the HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Internal description; only logged, or echoed in development mode
    pub message: String,
    pub retry_after_seconds: Option<u64>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let retry_after_seconds = match kind {
            ErrorKind::RateLimited => Some(RETRY_AFTER_SECONDS),
            _ => None,
        };
        Self {
            kind,
            message: message.into(),
            retry_after_seconds,
        }
    }

    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigMissing, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Build the client-facing body. Internal details are included only when asked.
    pub fn to_response(&self, include_details: bool) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.kind.status_code(),
            Json(ErrorResponse {
                error: self.kind.title().to_string(),
                message: self.kind.public_message().to_string(),
                code: Some(self.kind.code().to_string()),
                retry_after: self.retry_after_seconds,
                details: include_details.then(|| self.message.clone()),
            }),
        )
    }
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        self.to_response(false).into_response()
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// What the classifier can observe about a failed model call
#[derive(Debug, Clone)]
pub struct FailureSignal {
    message: String,
    status: Option<u16>,
}

impl FailureSignal {
    pub fn new(message: &str, status: Option<u16>) -> Self {
        Self {
            message: message.to_lowercase(),
            status,
        }
    }

    fn mentions(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| self.message.contains(phrase))
    }

    fn status_in(&self, codes: &[u16]) -> bool {
        self.status.is_some_and(|status| codes.contains(&status))
    }
}

impl From<&ModelError> for FailureSignal {
    fn from(err: &ModelError) -> Self {
        FailureSignal::new(&err.to_string(), err.status())
    }
}

pub type Predicate = fn(&FailureSignal) -> bool;

fn mentions_credential(signal: &FailureSignal) -> bool {
    signal.status_in(&[401]) || signal.mentions(&["api key", "api_key", "apikey", "credential"])
}

fn is_rate_limited(signal: &FailureSignal) -> bool {
    signal.status_in(&[429])
        || signal.mentions(&[
            "rate limit",
            "rate_limit",
            "quota",
            "resource_exhausted",
            "too many requests",
            "429",
        ])
}

fn is_timeout(signal: &FailureSignal) -> bool {
    signal.status_in(&[408, 504])
        || signal.mentions(&["timeout", "timed out", "deadline exceeded", "deadline_exceeded"])
}

fn is_upstream_failure(signal: &FailureSignal) -> bool {
    signal.status.is_some_and(|status| status >= 500)
        || signal.mentions(&["server error", "service unavailable", "[unavailable]", "bad gateway"])
}

/// Classification rules in precedence order.
pub const CLASSIFICATION_RULES: &[(ErrorKind, Predicate)] = &[
    (ErrorKind::ConfigMissing, mentions_credential),
    (ErrorKind::RateLimited, is_rate_limited),
    (ErrorKind::Timeout, is_timeout),
    (ErrorKind::Upstream, is_upstream_failure),
];

/// Pick the kind of the first rule matching `signal`.
pub fn classify_signal(signal: &FailureSignal) -> ErrorKind {
    CLASSIFICATION_RULES
        .iter()
        .find(|(_, predicate)| predicate(signal))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Internal)
}

/// Classify a failed model call.
pub fn classify(err: &ModelError) -> ClassifiedError {
    let kind = classify_signal(&FailureSignal::from(err));
    ClassifiedError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(message: &str, status: Option<u16>) -> ErrorKind {
        classify_signal(&FailureSignal::new(message, status))
    }

    #[test]
    fn test_each_rule_independently() {
        let cases: &[(ErrorKind, &str, Option<u16>)] = &[
            (ErrorKind::ConfigMissing, "API key not valid. Please pass a valid API key.", Some(400)),
            (ErrorKind::ConfigMissing, "missing API_KEY", None),
            (ErrorKind::ConfigMissing, "unauthenticated", Some(401)),
            (ErrorKind::RateLimited, "Quota exceeded for metric", None),
            (ErrorKind::RateLimited, "rate limit reached", None),
            (ErrorKind::RateLimited, "[RESOURCE_EXHAUSTED] slow down", None),
            (ErrorKind::RateLimited, "slow down", Some(429)),
            (ErrorKind::Timeout, "Request timeout: operation timed out", None),
            (ErrorKind::Timeout, "Deadline exceeded", None),
            (ErrorKind::Timeout, "gateway", Some(504)),
            (ErrorKind::Upstream, "Internal Server Error", None),
            (ErrorKind::Upstream, "boom", Some(500)),
            (ErrorKind::Upstream, "[UNAVAILABLE] The model is overloaded", None),
            (ErrorKind::Internal, "something odd happened", None),
            (ErrorKind::Internal, "bad request", Some(400)),
            (ErrorKind::Internal, "", None),
        ];

        for (expected, message, status) in cases {
            assert_eq!(kind_of(message, *status), *expected, "message {:?} status {:?}", message, status);
        }
    }

    #[test]
    fn test_rule_predicates_enumerated() {
        let kinds: Vec<ErrorKind> = CLASSIFICATION_RULES.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::ConfigMissing,
                ErrorKind::RateLimited,
                ErrorKind::Timeout,
                ErrorKind::Upstream
            ]
        );

        let neutral = FailureSignal::new("nothing to see", None);
        for (kind, predicate) in CLASSIFICATION_RULES {
            assert!(!predicate(&neutral), "{:?} matched a neutral signal", kind);
        }
    }

    #[test]
    fn test_precedence() {
        // rate limit beats upstream status
        assert_eq!(kind_of("rate limit exceeded", Some(503)), ErrorKind::RateLimited);
        // credential beats rate limit
        assert_eq!(kind_of("API key quota exhausted", Some(429)), ErrorKind::ConfigMissing);
        // timeout beats upstream
        assert_eq!(kind_of("upstream timeout", Some(500)), ErrorKind::Timeout);
    }

    #[test]
    fn test_classify_model_errors() {
        let quota = ModelError::Status {
            status: 429,
            message: "[RESOURCE_EXHAUSTED] Quota exceeded".to_string(),
        };
        let classified = classify(&quota);
        assert_eq!(classified.kind, ErrorKind::RateLimited);
        assert_eq!(classified.retry_after_seconds, Some(RETRY_AFTER_SECONDS));

        let timeout = classify(&ModelError::Timeout("operation timed out".to_string()));
        assert_eq!(timeout.kind, ErrorKind::Timeout);
        assert_eq!(timeout.retry_after_seconds, None);

        let overloaded = classify(&ModelError::Status {
            status: 503,
            message: "The model is overloaded".to_string(),
        });
        assert_eq!(overloaded.kind, ErrorKind::Upstream);

        let parse = classify(&ModelError::Parse("expected value".to_string()));
        assert_eq!(parse.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_response_hides_details_unless_requested() {
        let err = ClassifiedError::new(ErrorKind::RateLimited, "raw upstream text");

        let (status, Json(body)) = err.to_response(false);
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.code.as_deref(), Some("RATE_LIMIT_EXCEEDED"));
        assert_eq!(body.retry_after, Some(60));
        assert_eq!(body.details, None);
        assert!(!body.message.contains("raw upstream text"));

        let (_, Json(body)) = err.to_response(true);
        assert_eq!(body.details.as_deref(), Some("raw upstream text"));

        let (status, Json(body)) = ClassifiedError::config_missing("x").to_response(false);
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "CONFIG_ERROR");
        assert!(json.get("retryAfter").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::BadInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::ConfigMissing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorKind::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorKind::Upstream.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorKind::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
