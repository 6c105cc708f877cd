//! Application configuration loaded from environment variables.

use std::str::FromStr;

use services::FailurePolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `REDIS_URL`: Redis URL; an in-process cache is used when unset
/// - `JWT_SECRET`: HS256 secret for bearer tokens (default: `"dev-secret"`)
/// - `FRONTEND_URL`: base of payment redirects (default: `"http://localhost:3000"`)
/// - `VNP_TMN_CODE`, `VNP_SECURE_SECRET`, `VNP_HOST`: VNPay merchant settings
/// - `PAYMENT_FAILURE_POLICY`: `cancel` or `delete` (default: `cancel`)
/// - `SEED_PATH`: JSON file of users and products loaded at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub vnp_tmn_code: String,
    pub vnp_secure_secret: String,
    pub vnp_host: String,
    pub payment_failure_policy: FailurePolicy,
    pub seed_path: Option<String>,
    /// Variables whose values could not be parsed, with the rejected value.
    /// The default was used instead; `main` logs these once tracing is up.
    pub rejected: Vec<(&'static str, String)>,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
    rejected: &mut Vec<(&'static str, String)>,
) -> T {
    match raw {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                rejected.push((name, raw));
                default
            }
        },
        None => default,
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut rejected = Vec::new();
        let port = parse_or("PORT", optional_var("PORT"), defaults.port, &mut rejected);
        let payment_failure_policy = parse_or(
            "PAYMENT_FAILURE_POLICY",
            optional_var("PAYMENT_FAILURE_POLICY"),
            defaults.payment_failure_policy,
            &mut rejected,
        );

        Self {
            host: var_or("HOST", &defaults.host),
            port,
            log_level: var_or("RUST_LOG", &defaults.log_level),
            database_url: optional_var("DATABASE_URL"),
            redis_url: optional_var("REDIS_URL"),
            jwt_secret: var_or("JWT_SECRET", &defaults.jwt_secret),
            frontend_url: var_or("FRONTEND_URL", &defaults.frontend_url),
            vnp_tmn_code: var_or("VNP_TMN_CODE", &defaults.vnp_tmn_code),
            vnp_secure_secret: var_or("VNP_SECURE_SECRET", &defaults.vnp_secure_secret),
            vnp_host: var_or("VNP_HOST", &defaults.vnp_host),
            payment_failure_policy,
            seed_path: optional_var("SEED_PATH"),
            rejected,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            redis_url: None,
            jwt_secret: "dev-secret".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            vnp_tmn_code: "TMNCODE".to_string(),
            vnp_secure_secret: "secret".to_string(),
            vnp_host: "https://sandbox.vnpayment.vn".to_string(),
            payment_failure_policy: FailurePolicy::Cancel,
            seed_path: None,
            rejected: Vec::new(),
        }
    }
}
