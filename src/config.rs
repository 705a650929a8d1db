use std::env;
use std::str::FromStr;

use rand::RngCore;

use crate::error::AppError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_QUEUE_NAME: &str = "visitor-pass-requests";
pub const DEFAULT_LLM_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_BLOB_CONTAINER: &str = "passes";
pub const DEFAULT_MAIL_SENDER: &str = "no-reply@campus-gate.local";

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

#[derive(Clone, Debug)]
pub struct BlobConfig {
    pub store_url: String,
    pub token: Option<String>,
    pub container: String,
    pub public_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub service_url: String,
    pub token: String,
    pub sender: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// `None` selects the in-memory visitor store.
    pub database_url: Option<String>,
    /// `None` selects the in-memory pass queue.
    pub pass_queue_url: Option<String>,
    pub pass_queue_name: String,
    pub pass_max_attempts: i32,
    pub worker_poll_secs: u64,
    pub worker_enabled: bool,
    pub llm: Option<LlmConfig>,
    pub blob: Option<BlobConfig>,
    pub mail: Option<MailConfig>,
    pub public_base_url: String,
    pub pass_link_secret: String,
    pub admin_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            pass_queue_url: None,
            pass_queue_name: DEFAULT_QUEUE_NAME.to_string(),
            pass_max_attempts: 5,
            worker_poll_secs: 5,
            worker_enabled: true,
            llm: None,
            blob: None,
            mail: None,
            public_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            pass_link_secret: random_secret(),
            admin_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let port = parse_var("PORT", DEFAULT_PORT)?;

        let llm = match (var("LLM_ENDPOINT"), var("LLM_API_KEY"), var("LLM_DEPLOYMENT")) {
            (Some(endpoint), Some(api_key), Some(deployment)) => Some(LlmConfig {
                endpoint,
                api_key,
                deployment,
                api_version: var("LLM_API_VERSION").unwrap_or_else(|| DEFAULT_LLM_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let blob = var("BLOB_STORE_URL").map(|store_url| BlobConfig {
            store_url,
            token: var("BLOB_STORE_TOKEN"),
            container: var("BLOB_CONTAINER").unwrap_or_else(|| DEFAULT_BLOB_CONTAINER.to_string()),
            public_url: var("BLOB_PUBLIC_URL"),
        });

        let mail = var("MAIL_SERVICE_URL").map(|service_url| MailConfig {
            service_url,
            token: var("MAIL_SERVICE_TOKEN").unwrap_or_default(),
            sender: var("MAIL_SENDER").unwrap_or_else(|| DEFAULT_MAIL_SENDER.to_string()),
        });

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            pass_queue_url: var("PASS_QUEUE_URL"),
            pass_queue_name: var("PASS_QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            pass_max_attempts: parse_var("PASS_MAX_ATTEMPTS", 5)?,
            worker_poll_secs: parse_var("PASS_WORKER_POLL_SECS", 5)?,
            worker_enabled: parse_bool("PASS_WORKER_ENABLED", true)?,
            llm,
            blob,
            mail,
            public_base_url: var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{}", port)),
            pass_link_secret: var("PASS_LINK_SECRET").unwrap_or_else(random_secret),
            admin_token: var("ADMIN_TOKEN"),
        })
    }
}

/// Blank values count as unset.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation(format!("{} has an invalid value: {}", name, raw))),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool, AppError> {
    match var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(AppError::Validation(format!("{} has an invalid value: {}", name, v))),
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
