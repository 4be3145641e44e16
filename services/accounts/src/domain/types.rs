use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keystone_domain::user::display_name;

use crate::error::AccountsError;

/// User account as stored by the accounts service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    /// Argon2id PHC string. Never plaintext.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(
            &self.first_name,
            self.middle_name.as_deref(),
            &self.first_surname,
            self.second_surname.as_deref(),
        )
    }
}

/// Profile fields supplied by callers; the service owns id, password and timestamps.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
}

/// Partial update. `password_hash` is only ever set from a freshly hashed password.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.first_surname.is_none()
            && self.second_surname.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.role_id.is_none()
            && self.password_hash.is_none()
    }

    /// Apply the set fields to an in-memory `user`.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.middle_name {
            user.middle_name = Some(v.clone());
        }
        if let Some(v) = &self.first_surname {
            user.first_surname = v.clone();
        }
        if let Some(v) = &self.second_surname {
            user.second_surname = Some(v.clone());
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.phone {
            user.phone = Some(v.clone());
        }
        if let Some(v) = self.role_id {
            user.role_id = v;
        }
        if let Some(v) = &self.password_hash {
            user.password_hash = v.clone();
        }
    }
}

/// Exact-match predicates on user fields. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub first_surname: Option<String>,
    pub phone: Option<String>,
}

impl UserFilter {
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.email.as_ref().is_none_or(|v| *v == user.email)
            && self.role_id.is_none_or(|v| v == user.role_id)
            && self.first_name.as_ref().is_none_or(|v| *v == user.first_name)
            && self
                .first_surname
                .as_ref()
                .is_none_or(|v| *v == user.first_surname)
            && self
                .phone
                .as_ref()
                .is_none_or(|v| user.phone.as_ref() == Some(v))
    }
}

/// Transient login input. The plaintext password is only compared, never stored.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Transient second-factor input: the user and the code they were sent.
#[derive(Debug, Clone)]
pub struct CodeChallenge {
    pub user_id: Uuid,
    pub code: String,
}

/// Session record: one per identification attempt, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub code_consumed: bool,
    /// Empty until the code is redeemed.
    pub token: String,
    pub token_consumed: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl LoginRecord {
    /// Fresh record for a just-issued code, expiring `ttl_secs` after `now`.
    ///
    /// Fails when the expiry is not representable.
    pub fn issue(
        user_id: Uuid,
        code: String,
        now: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<Self, AccountsError> {
        let expires_at = TimeDelta::try_seconds(ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| anyhow!("login code ttl of {ttl_secs}s is out of range"))?;
        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            code,
            code_consumed: false,
            token: String::new(),
            token_consumed: false,
            expires_at,
            created_at: now,
            consumed_at: None,
        })
    }

    /// Unconsumed and not yet expired at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.code_consumed && self.expires_at > now
    }
}

/// Notification hook persisted alongside the row that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

impl OutboxEvent {
    /// `key` must be unique per logical event; it becomes `<kind>:<key>`.
    pub fn new(kind: &str, user_id: Uuid, key: Uuid, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_owned(),
            payload,
            idempotency_key: format!("{kind}:{key}"),
        }
    }
}

pub const EVENT_USER_CREATED: &str = "user_created";
pub const EVENT_LOGIN_CODE_ISSUED: &str = "login_code_issued";

/// One-time login code length in characters.
pub const LOGIN_CODE_LEN: usize = 5;

/// Length of the password generated for new accounts.
pub const GENERATED_PASSWORD_LEN: usize = 10;

/// Maximum number of redeemable (unconsumed, unexpired) codes per user.
pub const MAX_ACTIVE_LOGIN_CODES: u64 = 5;
