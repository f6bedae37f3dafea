use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Timelike, Utc};

use crate::config::AuthConfig;
use crate::error::TokenError;
use crate::models::jwt::{Claims, Identity, TokenKind, TokenPair};
use crate::services::jwt_service::TokenCodec;

/// Mints access/refresh pairs. Never touches the session store.
#[derive(Clone)]
pub struct TokenIssuer {
    access: TokenCodec,
    refresh: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: TokenCodec::new(TokenKind::Access, &config.access_secret),
            refresh: TokenCodec::new(TokenKind::Refresh, &config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn issue(&self, identity: Identity) -> Result<TokenPair, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: Identity, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        // Claims carry whole seconds. `exp` rounds up so a token never lives
        // shorter than its configured TTL.
        let issued_at = now.trunc_subsecs(0);

        let access = Claims::new(
            TokenKind::Access,
            identity,
            issued_at,
            ceil_to_second(now + lifetime(self.access_ttl)?),
        );
        let refresh = Claims::new(
            TokenKind::Refresh,
            identity,
            issued_at,
            ceil_to_second(now + lifetime(self.refresh_ttl)?),
        );

        Ok(TokenPair {
            access_token: self.access.encode(&access)?,
            refresh_token: self.refresh.encode(&refresh)?,
            access_session_id: access.session_id,
            refresh_session_id: refresh.session_id,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }
}

fn lifetime(ttl: Duration) -> Result<TimeDelta, TokenError> {
    TimeDelta::from_std(ttl)
        .map_err(|_| TokenError::SigningFailure(format!("token lifetime out of range: {ttl:?}")))
}

fn ceil_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    if at.nanosecond() == 0 {
        at
    } else {
        at.trunc_subsecs(0) + TimeDelta::seconds(1)
    }
}
