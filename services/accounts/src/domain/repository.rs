#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use keystone_domain::pagination::Window;

use crate::domain::types::{LoginRecord, OutboxEvent, User, UserFilter, UserPatch, UserProfile};
use crate::error::AccountsError;

/// Credential store for user accounts.
pub trait UserRepository: Send + Sync {
    /// First user matching the filter, if any.
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, AccountsError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AccountsError>;

    async fn find(&self, filter: &UserFilter, window: Window)
    -> Result<Vec<User>, AccountsError>;

    async fn count(&self, filter: &UserFilter) -> Result<u64, AccountsError>;

    /// Insert a user and an outbox event atomically (same transaction).
    async fn create_with_outbox(
        &self,
        user: &User,
        event: &OutboxEvent,
    ) -> Result<(), AccountsError>;

    /// Apply a patch to one user. Returns `false` if no such user exists.
    async fn update_by_id(&self, id: Uuid, patch: &UserPatch) -> Result<bool, AccountsError>;

    /// Apply a patch to every user matching the filter. Returns the number updated.
    async fn update_all(&self, filter: &UserFilter, patch: &UserPatch)
    -> Result<u64, AccountsError>;

    /// Overwrite the profile fields of one user, keeping its password hash.
    /// Returns `false` if no such user exists.
    async fn replace_by_id(&self, id: Uuid, profile: &UserProfile) -> Result<bool, AccountsError>;

    /// Returns `false` if no such user exists.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AccountsError>;
}

/// Credential store for login session records.
pub trait LoginRepository: Send + Sync {
    /// Count redeemable (unconsumed, unexpired at `now`) codes for a user.
    async fn count_active(&self, user_id: Uuid, now: DateTime<Utc>)
    -> Result<u64, AccountsError>;

    /// Insert a login record and an outbox event atomically (same transaction).
    async fn create_with_outbox(
        &self,
        login: &LoginRecord,
        event: &OutboxEvent,
    ) -> Result<(), AccountsError>;

    /// Find the redeemable record for `(user_id, code)`.
    async fn find_redeemable(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginRecord>, AccountsError>;

    /// Mark the code consumed and attach the token in one conditional write,
    /// guarded by `code_consumed = false`. Returns `false` if another request
    /// redeemed the record first.
    async fn redeem(
        &self,
        id: Uuid,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsError>;
}
