use std::env;

/// Application-level constants
pub const APP_NAME: &str = "souzoku-scan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,souzoku_scan=debug"
}

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default vision model for classification and extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default per-request timeout toward the vision API.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default cap on concurrent outstanding vision API calls during batch
/// processing. Keeps the pipeline under the provider's rate limits.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Connection settings for the external vision-language OCR collaborator.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl OcrConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `GEMINI_API_KEY`, `GEMINI_BASE_URL`,
    /// `GEMINI_MODEL`, `OCR_TIMEOUT_SECS`, `OCR_MAX_CONCURRENCY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            timeout_secs: env::var("OCR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_concurrency: env::var("OCR_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
        }
    }
}
