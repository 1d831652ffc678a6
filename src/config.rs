// src/config.rs

use std::{env, path::PathBuf};

use dotenvy::dotenv;

use crate::quiz::scheduler::ReviewPolicy;

/// Ease factor stored for a fresh review schedule (hundredths, i.e. 2.50).
pub const DEFAULT_EASE_FACTOR: i32 = 250;

/// SM-2 never lets the ease factor drop below 1.30.
pub const MIN_EASE_FACTOR: i32 = 130;

pub const DEFAULT_JWT_EXPIRATION: u64 = 60 * 60 * 24;

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the server runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub review_policy: ReviewPolicy,
    pub seed_questions: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    /// Problems found while reading the environment. Logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = non_empty_var("DATABASE_URL");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut warnings = Vec::new();
        let review_policy = review_policy(non_empty_var("REVIEW_POLICY"), &mut warnings);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            log_dir,
            bind_addr,
            cors_origins,
            admin_username: non_empty_var("ADMIN_USERNAME"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            review_policy,
            seed_questions: non_empty_var("SEED_QUESTIONS").map(PathBuf::from),
            static_dir: non_empty_var("STATIC_DIR").map(PathBuf::from),
            warnings,
        }
    }

    /// Minimal configuration for tests and embedding: in-memory store,
    /// no seeding, no static files.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            log_dir: "logs".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            admin_username: None,
            admin_password: None,
            review_policy: ReviewPolicy::Ladder,
            seed_questions: None,
            static_dir: None,
            warnings: Vec::new(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Unknown names fall back to the ladder and leave a warning behind.
fn review_policy(raw: Option<String>, warnings: &mut Vec<String>) -> ReviewPolicy {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warnings.push(format!("{}; falling back to the interval ladder", e));
            ReviewPolicy::Ladder
        }),
        None => ReviewPolicy::Ladder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_review_policies_parse_quietly() {
        let mut warnings = Vec::new();
        assert_eq!(review_policy(Some("sm2".into()), &mut warnings), ReviewPolicy::Sm2);
        assert_eq!(review_policy(None, &mut warnings), ReviewPolicy::Ladder);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_review_policy_falls_back_with_warning() {
        let mut warnings = Vec::new();
        assert_eq!(review_policy(Some("fsrs".into()), &mut warnings), ReviewPolicy::Ladder);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("fsrs"));
    }
}
