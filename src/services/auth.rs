//! Authentication service
//!
//! Provides:
//! - User signup with field-level validation
//! - Password hashing with bcrypt
//! - JWT issuance and verification

use anyhow::anyhow;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::{CreateUser, Database, UserRecord};
use crate::error::{ApiError, FieldError};

const MIN_PASSWORD_LEN: usize = 5;
const MIN_NAME_LEN: usize = 2;
const DEFAULT_STATUS: &str = "I am new";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Claims carried by an issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub email: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verified requester identity, extracted from a bearer token
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Signup input
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_lifetime_secs: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_lifetime_secs: config.token_lifetime_secs,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Register a new user. Collects all field failures into one
    /// validation error; a duplicate email is a conflict, not a validation
    /// failure.
    pub async fn register(&self, input: RegisterInput) -> Result<UserRecord, ApiError> {
        let name = input.name.trim();
        let email = input.email.trim();
        let password = input.password.trim();

        let mut errors = Vec::new();
        if !EMAIL_RE.is_match(email) {
            errors.push(FieldError::new("email", "Please enter a valid email."));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new("password", "Password too short!"));
        }
        if name.chars().count() < MIN_NAME_LEN {
            errors.push(FieldError::new("name", "Name too short!"));
        }
        if !errors.is_empty() {
            return Err(ApiError::validation("Validation failed.", errors));
        }

        let users = self.db.users();
        if users.get_by_email(email).await?.is_some() {
            return Err(ApiError::Conflict("E-Mail address already exists!".into()));
        }

        let password_hash = self.hash_password(password)?;
        let user = users
            .create(CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                status: DEFAULT_STATUS.to_string(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Authenticate with email and password, issuing a signed token on
    /// success. Unknown email and wrong password are indistinguishable to
    /// the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, String), ApiError> {
        let user = self
            .db
            .users()
            .get_by_email(email.trim())
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Email or password is incorrect.".into()))?;

        if !self.verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(ApiError::Unauthorized("Email or password is incorrect.".into()));
        }

        let token = self.issue_token(&user)?;
        Ok((token, user.id))
    }

    /// Verify a bearer token and extract the requester identity
    pub fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // The token lifetime is the contract; no grace period.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "token verification failed");
            ApiError::Unauthorized("Not authenticated!".into())
        })?;

        Ok(Identity {
            user_id: data.claims.user_id,
            email: data.claims.email,
        })
    }

    fn issue_token(&self, user: &UserRecord) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = TokenClaims {
            email: user.email.clone(),
            user_id: user.id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.token_lifetime_secs)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(anyhow!("Failed to create token: {e}")))
    }

    fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        hash(password, self.config.bcrypt_cost)
            .map_err(|e| ApiError::Internal(anyhow!("Failed to hash password: {e}")))
    }

    fn verify_password(&self, password: &str, hashed: &str) -> Result<bool, ApiError> {
        verify(password, hashed)
            .map_err(|e| ApiError::Internal(anyhow!("Failed to verify password: {e}")))
    }
}
