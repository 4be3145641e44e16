use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use jsonwebtoken::{EncodingKey, Header, encode};

use keystone_auth_types::token::{ALGORITHM, AccessClaims, TokenInfo, validate_access_token};

use crate::domain::types::User;
use crate::error::AccountsError;

/// Signed access token plus its expiry (seconds since epoch).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs and checks access tokens with the secret injected at startup.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_secs: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

fn now_secs() -> anyhow::Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before UNIX epoch")?
        .as_secs())
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// Sign `{sub, name, email, role, iat, exp}` for a validated user.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AccountsError> {
        let iat = now_secs()?;
        let exp = iat
            .checked_add(self.ttl_secs)
            .context("access token expiry overflows")?;
        let claims = AccessClaims {
            sub: user.id.to_string(),
            name: user.display_name(),
            email: user.email.clone(),
            role: user.role_id.to_string(),
            iat,
            exp,
        };
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("sign access token")?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    pub fn check(&self, token: &str) -> Result<TokenInfo, AccountsError> {
        validate_access_token(token, &self.secret).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            AccountsError::InvalidToken
        })
    }
}
