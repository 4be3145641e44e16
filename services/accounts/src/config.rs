use anyhow::bail;
use serde::Deserialize;

use keystone_core::config::Config;
use keystone_core::tracing::LogFormat;

/// Accounts service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AccountsConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// HMAC secret for signing access tokens. Env var: `JWT_SECRET`.
    pub jwt_secret: String,
    /// TCP port to listen on (default 3000). Env var: `ACCOUNTS_PORT`.
    #[serde(default = "default_port")]
    pub accounts_port: u16,
    /// Access-token lifetime in seconds (default 3600).
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: u64,
    /// One-time login code lifetime in seconds (default 300).
    #[serde(default = "default_login_code_ttl")]
    pub login_code_ttl_secs: i64,
    /// `json` (default) or `pretty`.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_port() -> u16 {
    3000
}

fn default_access_token_ttl() -> u64 {
    3600
}

fn default_login_code_ttl() -> i64 {
    300
}

/// Upper bound for both token and login-code lifetimes: one year.
pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

impl Config for AccountsConfig {}

impl AccountsConfig {
    /// Reject lifetimes outside `1..=MAX_TTL_SECS`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TTL_SECS.unsigned_abs()).contains(&self.access_token_ttl_secs) {
            bail!(
                "ACCESS_TOKEN_TTL_SECS must be between 1 and {MAX_TTL_SECS}, got {}",
                self.access_token_ttl_secs
            );
        }
        if !(1..=MAX_TTL_SECS).contains(&self.login_code_ttl_secs) {
            bail!(
                "LOGIN_CODE_TTL_SECS must be between 1 and {MAX_TTL_SECS}, got {}",
                self.login_code_ttl_secs
            );
        }
        Ok(())
    }
}
