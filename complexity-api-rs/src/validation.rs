//! Analyze Request Validation
//!
//! Checks the shape, size and language of `POST /api/analyze` payloads and
//! turns them into an [`AnalysisRequest`]. Nothing that fails here reaches
//! the analysis service.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};

use crate::error::{ErrorKind, ErrorResponse};
use crate::models::{AnalysisRequest, MAX_CODE_LENGTH, SUPPORTED_LANGUAGES, UNKNOWN_LANGUAGE};

lazy_static::lazy_static! {
    /// Type constraints on the optional fields of an analyze request
    pub static ref ANALYZE_REQUEST_SCHEMA: JSONSchema = {
        let schema = json!({
            "type": "object",
            "properties": {
                "code": { "type": "string" },
                "language": { "type": ["string", "null"] },
                "problemTitle": { "type": ["string", "null"] }
            }
        });

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .expect("Invalid schema")
    };
}

/// Validation error for API requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiValidationError {
    #[error("{0}")]
    InvalidFormat(String),

    #[error("Content type must be {0}")]
    ContentType(String),

    #[error("Schema validation error: {0}")]
    Schema(String),

    #[error("Code is required and must be a string")]
    MissingCode,

    #[error("Code cannot be empty")]
    EmptyCode,

    #[error("Code is too long. Maximum 50,000 characters allowed.")]
    CodeTooLong,

    #[error("Language '{0}' is not supported. Supported languages: {}", SUPPORTED_LANGUAGES.join(", "))]
    UnsupportedLanguage(String),
}

impl ApiValidationError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let (status, error, code) = match self {
            Self::ContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported media type",
                "UNSUPPORTED_MEDIA_TYPE",
            ),
            _ => (
                ErrorKind::BadInput.status_code(),
                ErrorKind::BadInput.title(),
                ErrorKind::BadInput.code(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message: self.to_string(),
                code: Some(code.to_string()),
                retry_after: None,
                details: None,
            }),
        )
    }
}

/// Validate the Content-Type header
pub fn validate_content_type(headers: &HeaderMap, expected: &str) -> Result<(), ApiValidationError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !content_type.starts_with(expected) {
        return Err(ApiValidationError::ContentType(format!(
            "'{}', got '{}'",
            expected, content_type
        )));
    }

    Ok(())
}

fn validate_json_schema(json: &Value) -> Result<(), ApiValidationError> {
    if let Err(errors) = ANALYZE_REQUEST_SCHEMA.validate(json) {
        let error_details: Vec<String> = errors
            .map(|err| format!("{} at '{}'", err, err.instance_path))
            .collect();

        return Err(ApiValidationError::Schema(if error_details.is_empty() {
            "Schema validation failed".to_string()
        } else {
            error_details.join("; ")
        }));
    }

    Ok(())
}

/// Parse and validate a raw analyze request body.
pub fn parse_analyze_request(body: &[u8]) -> Result<AnalysisRequest, ApiValidationError> {
    let body_str = std::str::from_utf8(body).map_err(|_| {
        ApiValidationError::InvalidFormat("Request body is not valid UTF-8".to_string())
    })?;

    let json_value: Value = serde_json::from_str(body_str.trim())
        .map_err(|e| ApiValidationError::InvalidFormat(format!("Invalid JSON: {}", e)))?;

    validate_analyze_request(&json_value)
}

/// Validate an already parsed analyze request.
pub fn validate_analyze_request(payload: &Value) -> Result<AnalysisRequest, ApiValidationError> {
    let Value::Object(obj) = payload else {
        return Err(ApiValidationError::InvalidFormat(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let code = match obj.get("code") {
        Some(Value::String(code)) => code,
        _ => return Err(ApiValidationError::MissingCode),
    };

    validate_json_schema(payload)?;

    if code.trim().is_empty() {
        return Err(ApiValidationError::EmptyCode);
    }

    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ApiValidationError::CodeTooLong);
    }

    let language = match obj.get("language").and_then(Value::as_str) {
        Some(language) if !language.is_empty() => {
            let normalized = language.to_lowercase();
            if !SUPPORTED_LANGUAGES.contains(&normalized.as_str()) {
                return Err(ApiValidationError::UnsupportedLanguage(language.to_string()));
            }
            normalized
        }
        _ => UNKNOWN_LANGUAGE.to_string(),
    };

    let problem_title = obj
        .get("problemTitle")
        .and_then(Value::as_str)
        .map(|title| title.trim().to_string())
        .unwrap_or_default();

    Ok(AnalysisRequest {
        code: code.trim().to_string(),
        language,
        problem_title,
    })
}
