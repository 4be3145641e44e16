//! Access-token claims and validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "TOKEN_ISSUER", test))]
use serde::Serialize;
use uuid::Uuid;

/// Signing algorithm for every access token.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Identity carried by a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: Uuid,
    pub expires_at: u64,
}

/// Errors returned by [`validate_access_token`].
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload shared by the issuer (accounts service) and verifiers.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | user ID (UUID string) |
/// | `name` | custom | composed display name |
/// | `email` | custom | login email |
/// | `role` | custom | role ID (UUID string) |
/// | `iat` | `iat` | issued-at, seconds since epoch |
/// | `exp` | `exp` | expiry, seconds since epoch |
///
/// [`Serialize`] requires the **`TOKEN_ISSUER`** cargo feature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(any(feature = "TOKEN_ISSUER", test), derive(Serialize))]
pub struct AccessClaims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

/// HS256 with `exp` checked and `sub` + `exp` required. Default 60s leeway.
fn validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

/// Decode and verify a token, returning the raw claims.
pub fn decode_claims(token: &str, secret: &str) -> Result<AccessClaims, TokenError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;
    Ok(data.claims)
}

/// Validate an access token and parse the identity it asserts.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, TokenError> {
    let claims = decode_claims(token, secret)?;
    let user_id = claims.sub.parse().map_err(|_| TokenError::Malformed)?;
    let role_id = claims.role.parse().map_err(|_| TokenError::Malformed)?;
    Ok(TokenInfo {
        user_id,
        name: claims.name,
        email: claims.email,
        role_id,
        expires_at: claims.exp,
    })
}
