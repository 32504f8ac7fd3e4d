//! Command-line and environment configuration for the relay.

use std::time::Duration;

use clap::Parser;

use crate::{
    domain::{JobOptions, LanguageCode},
    error::ServerError,
    infrastructure::translator::DEFAULT_MODEL,
};

/// Multilingual chat relay with asynchronous machine translation
#[derive(Debug, Clone, Parser)]
#[command(name = "tsuyaku-server", version, about)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "TSUYAKU_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TSUYAKU_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared HS256 secret used to verify client tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// API key of the translation engine
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub openai_api_key: String,

    /// Root URL of the chat-completions API
    #[arg(
        long,
        env = "TSUYAKU_TRANSLATOR_URL",
        default_value = "https://api.openai.com/v1"
    )]
    pub translator_url: String,

    #[arg(long, env = "TSUYAKU_TRANSLATOR_MODEL", default_value = DEFAULT_MODEL)]
    pub translator_model: String,

    /// Upper bound for a single translation call, in seconds
    #[arg(long, env = "TSUYAKU_TRANSLATE_TIMEOUT_SECS", default_value_t = 30)]
    pub translate_timeout_secs: u64,

    /// Maximum number of translation jobs processed at once
    #[arg(
        long,
        env = "TSUYAKU_WORKER_CONCURRENCY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub worker_concurrency: u32,

    /// Attempts per translation job, including the first one
    #[arg(
        long,
        env = "TSUYAKU_JOB_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub job_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "TSUYAKU_JOB_BACKOFF_MS", default_value_t = 1000)]
    pub job_backoff_ms: u64,

    /// Messages returned when joining a room
    #[arg(long, env = "TSUYAKU_RECENT_LIMIT", default_value_t = 50)]
    pub recent_limit: usize,

    /// Viewing language of a connection until it picks one
    #[arg(long, env = "TSUYAKU_DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: String,

    /// Seconds an unauthenticated socket may wait before sending `authenticate`
    #[arg(long, env = "TSUYAKU_AUTH_GRACE_SECS", default_value_t = 10)]
    pub auth_grace_secs: u64,

    /// Relay root URL. When set, finished translations are POSTed there
    /// instead of being delivered in-process.
    #[arg(long, env = "TSUYAKU_NOTIFY_URL")]
    pub notify_url: Option<String>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn translate_timeout(&self) -> Duration {
        Duration::from_secs(self.translate_timeout_secs)
    }

    pub fn auth_grace(&self) -> Duration {
        Duration::from_secs(self.auth_grace_secs)
    }

    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            max_attempts: self.job_attempts,
            backoff_initial: Duration::from_millis(self.job_backoff_ms),
        }
    }

    pub fn default_language(&self) -> Result<LanguageCode, ServerError> {
        LanguageCode::new(self.default_language.clone())
            .map_err(|e| ServerError::Config(format!("default language: {e}")))
    }

    /// Checks that cannot be expressed as clap value parsers
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ServerError::Config("JWT secret must not be empty".to_string()));
        }
        if self.recent_limit == 0 {
            return Err(ServerError::Config(
                "recent message limit must be at least 1".to_string(),
            ));
        }
        self.default_language()?;
        Ok(())
    }
}
