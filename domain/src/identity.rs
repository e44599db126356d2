//! Identities behind access tokens

use crate::EntityId;
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use library::BoxedError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const ACCESS_TOKEN_TYPE: &str = "access";

/// User a token has been issued to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Numeric user id
    pub id: EntityId,
    /// Unique, human readable name
    pub username: String,
}

/// Reasons a token does not resolve to an identity
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed, forged or otherwise unacceptable token
    #[error("invalid token")]
    Invalid,
    /// Token was valid at some point but no longer is
    #[error("token has expired")]
    Expired,
    /// The authority could not be consulted
    #[error("identity lookup failed")]
    Lookup(#[source] BoxedError),
}

/// Authority resolving access tokens into identities
#[async_trait]
pub trait TokenValidator {
    /// Validates the token and returns the identity it belongs to
    async fn validate(&self, token: &str) -> Result<UserIdentity, TokenError>;
}

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject of the token
    pub user_id: EntityId,
    /// Name of the subject
    pub username: String,
    /// Expiry as seconds since the epoch
    pub exp: i64,
    /// Purpose of the token, only `access` tokens are accepted
    #[serde(default)]
    pub token_type: Option<String>,
}

/// [`TokenValidator`] for HS256 signed JSON web tokens
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    /// Creates a validator that accepts tokens signed with the given shared secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(&self, token: &str) -> Result<UserIdentity, TokenError> {
        let claims = decode::<AccessClaims>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    debug!(error = %e, "Rejected token");
                    TokenError::Invalid
                }
            })?
            .claims;

        if claims.token_type.as_deref() != Some(ACCESS_TOKEN_TYPE) {
            debug!(token_type = ?claims.token_type, "Rejected token of wrong type");
            return Err(TokenError::Invalid);
        }

        Ok(UserIdentity {
            id: claims.user_id,
            username: claims.username,
        })
    }
}
