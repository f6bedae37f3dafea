use bcrypt::{hash, verify};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::jwt::Identity;
use crate::models::user::User;

/// Email/password check in front of the session authority. Knows nothing
/// about tokens.
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(pool: SqlitePool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let email = email.trim().to_lowercase();

        if User::find_by_email(&self.pool, &email).await?.is_some() {
            return Err(ApiError::UserExists);
        }

        let password_hash = hash(password, self.bcrypt_cost)?;
        let id = User::create(&self.pool, &email, &password_hash).await?;

        info!(user_id = id, "User registered");
        Ok(Identity(id))
    }

    /// Unknown email and wrong password are reported the same way.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let email = email.trim().to_lowercase();

        let Some(user) = User::find_by_email(&self.pool, &email).await? else {
            warn!("Login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        if !verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        Ok(Identity(user.id))
    }
}
