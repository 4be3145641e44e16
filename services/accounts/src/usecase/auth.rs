//! Two-step login: password identification issues a one-time code, and
//! redeeming the code yields a signed access token.
//!
//! ```text
//! [Unauthenticated] --identify ok--> [CodeIssued] --code ok + token--> [Authenticated]
//! [Unauthenticated] --identify fails--> [Rejected]
//! [CodeIssued] --unknown/consumed/expired code--> [Rejected]
//! ```

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use keystone_auth_types::token::TokenInfo;
use keystone_domain::user::normalize_email;

use crate::domain::repository::{LoginRepository, UserRepository};
use crate::domain::types::{
    CodeChallenge, Credentials, EVENT_LOGIN_CODE_ISSUED, LOGIN_CODE_LEN, LoginRecord,
    MAX_ACTIVE_LOGIN_CODES, OutboxEvent, User, UserFilter,
};
use crate::error::AccountsError;
use crate::secret::{generate_random_text, verify_password};
use crate::usecase::token::{IssuedToken, TokenIssuer};

// ── Stage 1: identify ────────────────────────────────────────────────────────

/// The single user whose email and password both match, or `None`.
pub async fn identify<U: UserRepository>(
    users: &U,
    credentials: &Credentials,
) -> Result<Option<User>, AccountsError> {
    let email = normalize_email(&credentials.email);
    let Some(user) = users.find_one(&UserFilter::by_email(email)).await? else {
        return Ok(None);
    };

    if verify_password(&credentials.password, &user.password_hash).is_match() {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub struct IdentifyUseCase<U, L>
where
    U: UserRepository,
    L: LoginRepository,
{
    pub users: U,
    pub logins: L,
    pub code_ttl_secs: i64,
}

impl<U, L> IdentifyUseCase<U, L>
where
    U: UserRepository,
    L: LoginRepository,
{
    /// Identify the user and open a login attempt with a fresh one-time code.
    pub async fn execute(&self, credentials: Credentials) -> Result<User, AccountsError> {
        let user = identify(&self.users, &credentials)
            .await?
            .ok_or(AccountsError::InvalidCredentials)?;

        let now = Utc::now();
        let active = self.logins.count_active(user.id, now).await?;
        if active >= MAX_ACTIVE_LOGIN_CODES {
            warn!(user_id = %user.id, active, "login code limit reached");
            return Err(AccountsError::TooManyLoginCodes);
        }

        let code = generate_random_text(LOGIN_CODE_LEN);
        let login = LoginRecord::issue(user.id, code, now, self.code_ttl_secs)?;
        let event = OutboxEvent::new(
            EVENT_LOGIN_CODE_ISSUED,
            user.id,
            login.id,
            json!({ "email": user.email, "code": login.code }),
        );
        self.logins.create_with_outbox(&login, &event).await?;

        info!(user_id = %user.id, login_id = %login.id, "login code issued");
        Ok(user)
    }
}

// ── Stage 2: validate code ───────────────────────────────────────────────────

/// The redeemable login record for the challenge and its user, or `None`.
///
/// Performs no mutation; redemption happens after the token is signed.
pub async fn validate_code<U, L>(
    users: &U,
    logins: &L,
    challenge: &CodeChallenge,
    now: DateTime<Utc>,
) -> Result<Option<(LoginRecord, User)>, AccountsError>
where
    U: UserRepository,
    L: LoginRepository,
{
    let Some(login) = logins
        .find_redeemable(challenge.user_id, &challenge.code, now)
        .await?
    else {
        return Ok(None);
    };
    let Some(user) = users.find_by_id(login.user_id).await? else {
        return Ok(None);
    };
    Ok(Some((login, user)))
}

// ── Stage 3: issue token ─────────────────────────────────────────────────────

#[derive(Debug)]
pub struct VerifyCodeOutput {
    pub user: User,
    pub token: IssuedToken,
}

pub struct VerifyCodeUseCase<U, L>
where
    U: UserRepository,
    L: LoginRepository,
{
    pub users: U,
    pub logins: L,
    pub tokens: TokenIssuer,
}

impl<U, L> VerifyCodeUseCase<U, L>
where
    U: UserRepository,
    L: LoginRepository,
{
    /// Redeem a one-time code for an access token. Succeeds at most once per code.
    pub async fn execute(&self, challenge: CodeChallenge) -> Result<VerifyCodeOutput, AccountsError> {
        let now = Utc::now();
        let (login, user) = validate_code(&self.users, &self.logins, &challenge, now)
            .await?
            .ok_or(AccountsError::InvalidCode)?;

        let token = self.tokens.issue(&user)?;

        if !self.logins.redeem(login.id, &token.token, now).await? {
            warn!(user_id = %user.id, login_id = %login.id, "login code redeemed concurrently");
            return Err(AccountsError::InvalidCode);
        }

        info!(user_id = %user.id, login_id = %login.id, "login code redeemed");
        Ok(VerifyCodeOutput { user, token })
    }
}

// ── Token check ──────────────────────────────────────────────────────────────

pub struct CheckTokenUseCase {
    pub tokens: TokenIssuer,
}

impl CheckTokenUseCase {
    pub fn execute(&self, token: &str) -> Result<TokenInfo, AccountsError> {
        self.tokens.check(token)
    }
}

/// Parse a path/body user id; malformed ids are just another failed challenge.
pub fn parse_challenge_user_id(raw: &str) -> Result<Uuid, AccountsError> {
    raw.parse().map_err(|_| AccountsError::InvalidCode)
}
