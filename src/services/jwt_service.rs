// src/services/jwt_service.rs
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::error::TokenError;
use crate::models::jwt::{Claims, TokenKind};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// HS256 codec bound to one token kind and its secret.
///
/// Access and refresh tokens each get their own instance, so a token signed
/// for one kind fails the signature check of the other.
#[derive(Clone)]
pub struct TokenCodec {
    kind: TokenKind,
    enc_key: EncodingKey,
    dec_key: DecodingKey,
    validation: Validation,
    has_secret: bool,
}

impl TokenCodec {
    pub fn new(kind: TokenKind, secret: &str) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is the verifier's job; the codec only answers "is this ours".
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            kind,
            enc_key: EncodingKey::from_secret(secret.as_bytes()),
            dec_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            has_secret: !secret.is_empty(),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        if !self.has_secret {
            return Err(TokenError::SigningFailure(format!(
                "no {} token secret configured",
                self.kind
            )));
        }
        if claims.kind != self.kind {
            return Err(TokenError::SigningFailure(format!(
                "cannot sign {} claims with the {} key",
                claims.kind, self.kind
            )));
        }

        encode(&Header::new(ALGORITHM), claims, &self.enc_key)
            .map_err(|e| TokenError::SigningFailure(e.to_string()))
    }

    /// Checks the algorithm and signature and rebuilds the claims. Does not
    /// look at expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.dec_key, &self.validation)?.claims;

        if claims.kind != self.kind {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}
