use std::env;

/// Runtime configuration, loaded once at startup from the environment
/// (with `.env` support). Every key has a default so a bare checkout
/// runs without any setup.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub database_url: String,
    pub session_expiry_days: u32,
    pub argon2_salt_length: u32,
    pub max_message_length: usize,
    /// Delay before the assistant's canned reply is appended, in ms.
    pub ai_reply_delay_ms: u64,
    pub login_attempt_limit: u32,
    pub login_attempt_window_secs: i64,
    pub log_level: String,
}

impl PortalConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/ateneo.db?mode=rwc".to_string()),
            session_expiry_days: env::var("SESSION_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            argon2_salt_length: env::var("ARGON2_SALT_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16),
            max_message_length: env::var("MAX_MESSAGE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2048),
            ai_reply_delay_ms: env::var("AI_REPLY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            login_attempt_limit: env::var("LOGIN_ATTEMPT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            login_attempt_window_secs: env::var("LOGIN_ATTEMPT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/ateneo.db?mode=rwc".to_string(),
            session_expiry_days: 7,
            argon2_salt_length: 16,
            max_message_length: 2048,
            ai_reply_delay_ms: 1000,
            login_attempt_limit: 5,
            login_attempt_window_secs: 300,
            log_level: "info".to_string(),
        }
    }
}
