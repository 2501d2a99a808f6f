use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Not validated: an empty or wrong key surfaces as an HTTP failure.
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub database_url: Option<String>,
    /// Sessions not touched for this long are dropped with their logs.
    pub session_idle_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gemini = GeminiConfig {
            api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            timeout: Duration::from_secs(
                lookup("GEMINI_TIMEOUT_SECS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60),
            ),
        };

        Self {
            gemini,
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            session_idle_timeout: Duration::from_secs(
                60 * lookup("SESSION_IDLE_MINUTES")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(120),
            ),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
