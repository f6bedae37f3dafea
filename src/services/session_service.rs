use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::config::AuthConfig;
use crate::db::SessionStore;
use crate::error::{AuthError, StoreError};
use crate::models::jwt::{Claims, Identity, TokenKind, TokenPair};
use crate::services::{token_issuer::TokenIssuer, token_verifier::TokenVerifier};

/// Answers "is this credential live, and for whom", and revokes it.
///
/// A session id moves Issued -> Active (entry stored) -> Revoked or Expired.
/// Nothing leaves Revoked or Expired.
#[derive(Clone)]
pub struct SessionAuthority {
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    store: Arc<dyn SessionStore>,
}

impl SessionAuthority {
    pub fn new(config: &AuthConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            issuer: TokenIssuer::new(config),
            verifier: TokenVerifier::new(config),
            store,
        }
    }

    /// Mint a pair and record both sessions. If either write fails the login
    /// fails; an entry that did get written is left to expire.
    #[instrument(skip(self))]
    pub async fn login(&self, identity: Identity) -> Result<TokenPair, AuthError> {
        let pair = self.issuer.issue(identity)?;

        let now = Utc::now();
        let access_ttl = remaining_lifetime(pair.access_expires_at, now)?;
        let refresh_ttl = remaining_lifetime(pair.refresh_expires_at, now)?;

        self.store
            .put(pair.access_session_id, identity, access_ttl)
            .await
            .map_err(issuance_store_error)?;
        self.store
            .put(pair.refresh_session_id, identity, refresh_ttl)
            .await
            .map_err(issuance_store_error)?;

        info!(%identity, "Session created");
        Ok(pair)
    }

    /// Resolve an access token to the identity recorded in the store.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self.verify(access_token, TokenKind::Access)?;
        let identity = self.lookup(&claims).await?;
        Ok(identity)
    }

    /// Delete the access session. Revoking twice reports `Unauthorized` the
    /// second time.
    #[instrument(skip_all)]
    pub async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.verify(access_token, TokenKind::Access)?;

        let removed = self.store.delete(claims.session_id).await?;
        if removed == 0 {
            warn!(session_id = %claims.session_id, "Revocation of unknown session");
            return Err(AuthError::Unauthorized);
        }

        info!(identity = %claims.identity, "Session revoked");
        Ok(())
    }

    /// Exchange a live refresh token for a fresh pair. The refresh session is
    /// consumed, so each refresh token works once. It is consumed before the
    /// new pair is written, so a store failure while minting leaves the caller
    /// to log in again.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        let identity = self.lookup(&claims).await?;

        if self.store.delete(claims.session_id).await? == 0 {
            warn!(session_id = %claims.session_id, "Refresh session already consumed");
            return Err(AuthError::Unauthorized);
        }

        info!(%identity, "Refreshing session");
        self.login(identity).await
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        self.verifier.verify(token, kind).map_err(|e| {
            warn!(reason = %e, %kind, "Rejected token");
            AuthError::from(e)
        })
    }

    async fn lookup(&self, claims: &Claims) -> Result<Identity, AuthError> {
        match self.store.get(claims.session_id).await {
            Ok(identity) => Ok(identity),
            Err(StoreError::NotFound) => {
                warn!(session_id = %claims.session_id, "Session not found");
                Err(AuthError::Unauthorized)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Store TTL for a session expiring at `expires_at`. A token that is already
/// dead at write time is an issuance failure, never a silent no-op write.
pub(crate) fn remaining_lifetime(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Duration, AuthError> {
    match (expires_at - now).to_std() {
        Ok(ttl) if !ttl.is_zero() => Ok(ttl),
        _ => {
            error!(%expires_at, %now, "Token expired before its session was recorded");
            Err(AuthError::Issuance("token expired before it was recorded".to_string()))
        }
    }
}

// A store miss can't happen on a write; anything else is an outage.
fn issuance_store_error(err: StoreError) -> AuthError {
    match err {
        StoreError::Unavailable(reason) => AuthError::StoreUnavailable(reason),
        StoreError::NotFound => AuthError::Issuance("session store rejected write".to_string()),
    }
}

