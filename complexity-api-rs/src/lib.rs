use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod analysis;
pub mod config;
pub mod error;
pub mod llm_client;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

use analysis::AnalysisService;
use config::{ApiConfig, CorsPolicy};
use error::{ClassifiedError, ErrorKind, ErrorResponse};
use llm_client::GenerativeModel;
use models::{AnalysisResult, MAX_CODE_LENGTH, SUPPORTED_LANGUAGES};
use rate_limit::RateLimiter;
use validation::{parse_analyze_request, validate_content_type};

/// Successful analyze response body
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalyzeData,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeData {
    pub analysis: AnalysisResult,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub language: String,
    pub problem_title: Option<String>,
    pub code_length: usize,
    pub analyzed_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub supported_languages: Vec<String>,
    pub limits: ServiceLimits,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLimits {
    pub max_code_length: usize,
    pub rate_limit: String,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Core API state and functionality
pub struct ComplexityApi {
    config: ApiConfig,
    analysis: AnalysisService,
    rate_limiter: RateLimiter,
    started_at: Instant,
}

impl ComplexityApi {
    pub fn new(config: ApiConfig, model: Arc<dyn GenerativeModel>) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit, config.trust_proxy);
        Self {
            config,
            analysis: AnalysisService::new(model),
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn analysis(&self) -> &AnalysisService {
        &self.analysis
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        let mut api = Router::new()
            .route("/analyze", post(Self::analyze_handler))
            .route("/status", get(Self::status_handler));

        if self.config.environment.is_development() {
            api = api.route("/test-rate-limit", post(Self::test_rate_limit_handler));
        }

        // Content type is only checked on matched routes; unknown paths fall through to 404
        let api = api.route_layer(middleware::from_fn(Self::validate_content_type_middleware));

        Router::new()
            .route("/health", get(Self::health_handler))
            .nest("/api", api)
            .fallback(Self::not_found_handler)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit::rate_limit_middleware,
            ))
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(DefaultBodyLimit::disable())
            .layer(middleware::from_fn(security_headers::security_headers_middleware))
            .layer(Self::cors_layer(&self.config.cors))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
        let policy = policy.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
            }))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    }

    /// Middleware for validating request content type
    async fn validate_content_type_middleware(req: Request, next: Next) -> Response {
        if req.method() == Method::POST {
            if let Err(err) = validate_content_type(req.headers(), "application/json") {
                return err.to_response().into_response();
            }
        }

        next.run(req).await
    }

    /// POST /api/analyze
    async fn analyze_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let request = match parse_analyze_request(&body) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "Rejected analyze request");
                return err.to_response().into_response();
            }
        };

        let code_length = request.code.chars().count();
        tracing::info!(
            language = %request.language,
            code_length,
            "Analyzing code complexity"
        );

        match state
            .analysis
            .analyze(&request.code, &request.language, &request.problem_title)
            .await
        {
            Ok(analysis) => Json(AnalyzeResponse {
                success: true,
                data: AnalyzeData {
                    analysis,
                    metadata: AnalysisMetadata {
                        language: request.language,
                        problem_title: Some(request.problem_title).filter(|t| !t.is_empty()),
                        code_length,
                        analyzed_at: timestamp(),
                    },
                },
            })
            .into_response(),
            Err(err) => state.error_response(&err),
        }
    }

    fn error_response(&self, err: &ClassifiedError) -> Response {
        err.to_response(self.config.environment.is_development())
            .into_response()
    }

    /// GET /api/status
    async fn status_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        Json(StatusResponse {
            service: "Code Complexity Analyzer".to_string(),
            status: "active".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            supported_languages: SUPPORTED_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            limits: ServiceLimits {
                max_code_length: MAX_CODE_LENGTH,
                rate_limit: state.rate_limiter.policy().describe(),
            },
        })
    }

    /// POST /api/test-rate-limit (development only)
    async fn test_rate_limit_handler(State(state): State<Arc<Self>>) -> Response {
        let err = ClassifiedError::new(ErrorKind::RateLimited, "Simulated upstream rate limit");
        state.error_response(&err)
    }

    /// GET /health
    async fn health_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        Json(HealthResponse {
            status: "OK".to_string(),
            timestamp: timestamp(),
            service: "Complexity Analyzer API".to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        })
    }

    async fn not_found_handler() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Endpoint not found".to_string(),
                message: "The requested resource does not exist".to_string(),
                code: None,
                retry_after: None,
                details: None,
            }),
        )
    }
}
