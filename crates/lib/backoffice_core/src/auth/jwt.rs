//! JWT token codec for access and refresh tokens.
//!
//! Both classes are HS256, each under its own secret, so a leaked access
//! secret cannot forge refresh tokens and vice versa.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::TokenError;
use crate::models::auth::{AccessClaims, AccessPayload, RefreshClaims, RefreshPayload};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 30 * 24 * 60 * 60;

/// One signing secret, pre-expanded into its encode/decode keys.
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies access and refresh tokens.
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the two class secrets.
    ///
    /// Fails when either secret is empty or both are equal.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, TokenError> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(TokenError::Config("signing secrets must not be empty".into()));
        }
        if access_secret == refresh_secret {
            return Err(TokenError::Config(
                "access and refresh secrets must differ".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            validation,
        })
    }

    /// Sign an access token with the default 15 minute lifetime.
    pub fn sign_access(&self, payload: &AccessPayload) -> Result<String, TokenError> {
        self.sign_access_with_ttl(payload, Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS))
    }

    /// Sign an access token expiring `ttl` from now.
    pub fn sign_access_with_ttl(
        &self,
        payload: &AccessPayload,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            payload: payload.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        sign(&claims, &self.access.encoding)
    }

    /// Sign a refresh token with the default 30 day lifetime.
    pub fn sign_refresh(&self, payload: &RefreshPayload) -> Result<String, TokenError> {
        self.sign_refresh_with_ttl(payload, Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS))
    }

    /// Sign a refresh token expiring `ttl` from now.
    pub fn sign_refresh_with_ttl(
        &self,
        payload: &RefreshPayload,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            payload: payload.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        sign(&claims, &self.refresh.encoding)
    }

    /// Verify an access token under the access secret.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access.decoding, &self.validation)
    }

    /// Verify a refresh token under the refresh secret.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh.decoding, &self.validation)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| TokenError::Encode(e.to_string()))
}

fn verify<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<T, TokenError> {
    decode::<T>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // Malformed, wrong algorithm, bad signature: all the same to callers.
            _ => TokenError::InvalidSignature,
        })
}
