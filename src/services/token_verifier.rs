use chrono::{DateTime, Utc};

use crate::config::AuthConfig;
use crate::error::TokenError;
use crate::models::jwt::{Claims, TokenKind};
use crate::services::jwt_service::TokenCodec;

/// Stateless check of signature, algorithm and expiry.
#[derive(Clone)]
pub struct TokenVerifier {
    access: TokenCodec,
    refresh: TokenCodec,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: TokenCodec::new(TokenKind::Access, &config.access_secret),
            refresh: TokenCodec::new(TokenKind::Refresh, &config.refresh_secret),
        }
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, expected, Utc::now())
    }

    /// A token is rejected once `now` reaches its `exp`, whether or not the
    /// store has swept its session entry yet.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = self.codec(expected).decode(token)?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn codec(&self, kind: TokenKind) -> &TokenCodec {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
