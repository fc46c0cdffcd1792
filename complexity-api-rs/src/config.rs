//! Service configuration loaded from the environment.

use config_rs::{get_env_var, get_list_var, get_non_empty_var, Environment};

pub const SERVICE_NAME: &str = "complexity-api";
pub const DEFAULT_PORT: u16 = 10000;

/// Default request body limit (10MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: get_non_empty_var("GEMINI_API_KEY"),
            api_url: get_non_empty_var("GEMINI_API_URL").unwrap_or(defaults.api_url),
            model: get_non_empty_var("GEMINI_MODEL").unwrap_or(defaults.model),
            timeout_secs: get_env_var("GEMINI_TIMEOUT_SECS", defaults.timeout_secs),
        }
    }
}

/// Fixed-window request quota applied per client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window_secs: u64,
    pub max_requests: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_requests: 100,
        }
    }
}

impl RateLimitPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_secs: get_env_var("RATE_LIMIT_WINDOW_SECS", defaults.window_secs).max(1),
            max_requests: get_env_var("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
        }
    }

    /// Human readable form used by the status endpoint, e.g. "100 requests per 15 minutes".
    pub fn describe(&self) -> String {
        if self.window_secs % 60 == 0 {
            format!("{} requests per {} minutes", self.max_requests, self.window_secs / 60)
        } else {
            format!("{} requests per {} seconds", self.max_requests, self.window_secs)
        }
    }
}

/// Allowed browser origins. A trailing `*` matches any suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn for_environment(environment: Environment) -> Self {
        let mut allowed_origins = vec![
            "chrome-extension://*".to_string(),
            "moz-extension://*".to_string(),
        ];
        if !environment.is_production() {
            allowed_origins.push("http://localhost:*".to_string());
            allowed_origins.push("https://localhost:*".to_string());
        }
        Self { allowed_origins }
    }

    pub fn from_env(environment: Environment) -> Self {
        match get_list_var("CORS_ALLOWED_ORIGINS") {
            Some(allowed_origins) => Self { allowed_origins },
            None => Self::for_environment(environment),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => origin.starts_with(prefix),
            None => origin == pattern,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub environment: Environment,
    pub gemini: GeminiConfig,
    pub rate_limit: RateLimitPolicy,
    /// Key the rate limiter on `X-Forwarded-For` instead of the peer address
    pub trust_proxy: bool,
    pub cors: CorsPolicy,
    pub max_body_bytes: usize,
    pub verify_model_on_start: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            gemini: GeminiConfig::default(),
            rate_limit: RateLimitPolicy::default(),
            trust_proxy: false,
            cors: CorsPolicy::for_environment(environment),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            verify_model_on_start: false,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            gemini: GeminiConfig::from_env(),
            rate_limit: RateLimitPolicy::from_env(),
            trust_proxy: get_env_var("TRUST_PROXY", false),
            cors: CorsPolicy::from_env(environment),
            max_body_bytes: get_env_var("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            verify_model_on_start: get_env_var("VERIFY_MODEL_ON_START", false),
        }
    }
}
