//! Application configuration management

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables, read once at
/// startup and shared read-only thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite database URL (or a bare path via DATABASE_PATH)
    pub database_url: String,

    /// JWT secret for token signing and verification
    pub jwt_secret: String,

    /// Token lifetime in seconds (default: 1 hour)
    pub token_lifetime_secs: i64,

    /// Bcrypt cost factor (default: 12)
    pub bcrypt_cost: u32,

    /// Directory where uploaded images are stored
    pub uploads_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_PATH")
            .map(|p| format!("sqlite://{p}?mode=rwc"))
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| "sqlite://./data/feedhub.db?mode=rwc".to_string());

        // JWT_SECRET is always required - generate a random one if not provided in dev
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            // In production, this should be set explicitly
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};
            let mut hasher = DefaultHasher::new();
            std::time::SystemTime::now().hash(&mut hasher);
            format!("dev-secret-{}", hasher.finish())
        });

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url,

            jwt_secret,

            token_lifetime_secs: env::var("TOKEN_LIFETIME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60 * 60),

            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(12),

            uploads_path: env::var("UPLOADS_PATH").unwrap_or_else(|_| "./uploads".to_string()),
        })
    }
}
