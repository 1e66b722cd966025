//! Gateway configuration
//!
//! All settings come from environment variables with sensible defaults; only
//! the API key has no default. A missing key is not fatal here — it becomes
//! a configuration error when the Gemini client is constructed.

/// Runtime settings for the gateway and the Gemini client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    /// Gemini API key. Absence fails client construction, not startup.
    pub gemini_api_key: Option<String>,
    /// Model identifier, e.g. "models/gemini-2.5-flash".
    pub model: String,
    /// Gemini REST base URL.
    pub api_base: String,
    /// Provider request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "models/gemini-2.5-flash".to_string()),
            api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::default()
    }
}
