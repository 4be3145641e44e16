use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use keystone_domain::pagination::Window;
use keystone_domain::user::{is_valid_email, normalize_email};

use crate::domain::repository::UserRepository;
use crate::domain::types::{
    EVENT_USER_CREATED, GENERATED_PASSWORD_LEN, OutboxEvent, User, UserFilter, UserPatch,
    UserProfile,
};
use crate::error::AccountsError;
use crate::secret::{generate_random_text, hash_password};

/// Normalise and validate a caller-supplied profile.
fn checked_profile(mut profile: UserProfile) -> Result<UserProfile, AccountsError> {
    profile.email = normalize_email(&profile.email);
    if !is_valid_email(&profile.email) {
        return Err(AccountsError::InvalidEmail);
    }
    if profile.first_name.trim().is_empty() || profile.first_surname.trim().is_empty() {
        return Err(AccountsError::MissingData);
    }
    Ok(profile)
}

async fn ensure_email_free<R: UserRepository>(
    repo: &R,
    email: &str,
    owner: Option<Uuid>,
) -> Result<(), AccountsError> {
    match repo.find_one(&UserFilter::by_email(email)).await? {
        Some(existing) if Some(existing.id) != owner => Err(AccountsError::UserAlreadyExists),
        _ => Ok(()),
    }
}

// ── CreateUser ───────────────────────────────────────────────────────────────

pub struct CreateUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> CreateUserUseCase<R> {
    /// Create an account with a generated password. Only its hash is stored.
    pub async fn execute(&self, profile: UserProfile) -> Result<User, AccountsError> {
        let profile = checked_profile(profile)?;
        ensure_email_free(&self.repo, &profile.email, None).await?;

        let password = generate_random_text(GENERATED_PASSWORD_LEN);
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            first_name: profile.first_name,
            middle_name: profile.middle_name,
            first_surname: profile.first_surname,
            second_surname: profile.second_surname,
            email: profile.email,
            phone: profile.phone,
            role_id: profile.role_id,
            password_hash: hash_password(&password)?,
            created_at: now,
            updated_at: now,
        };
        let event = OutboxEvent::new(
            EVENT_USER_CREATED,
            user.id,
            user.id,
            json!({ "user_id": user.id, "email": user.email }),
        );
        self.repo.create_with_outbox(&user, &event).await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }
}

// ── GetUser / ListUsers / CountUsers ─────────────────────────────────────────

pub struct GetUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> GetUserUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<User, AccountsError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AccountsError::UserNotFound)
    }
}

pub struct ListUsersUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> ListUsersUseCase<R> {
    pub async fn execute(
        &self,
        filter: UserFilter,
        window: Window,
    ) -> Result<Vec<User>, AccountsError> {
        self.repo.find(&normalized_filter(filter), window.clamped()).await
    }
}

pub struct CountUsersUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> CountUsersUseCase<R> {
    pub async fn execute(&self, filter: UserFilter) -> Result<u64, AccountsError> {
        self.repo.count(&normalized_filter(filter)).await
    }
}

fn normalized_filter(mut filter: UserFilter) -> UserFilter {
    filter.email = filter.email.as_deref().map(normalize_email);
    filter
}

// ── UpdateUser / UpdateUsers ─────────────────────────────────────────────────

/// Caller-supplied partial update. `password` is plaintext and gets hashed.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
    pub password: Option<String>,
}

fn checked_patch(input: UpdateUserInput) -> Result<UserPatch, AccountsError> {
    let email = match input.email {
        Some(email) => {
            let email = normalize_email(&email);
            if !is_valid_email(&email) {
                return Err(AccountsError::InvalidEmail);
            }
            Some(email)
        }
        None => None,
    };
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&input.first_name) || blank(&input.first_surname) || blank(&input.password) {
        return Err(AccountsError::MissingData);
    }
    let password_hash = input.password.as_deref().map(hash_password).transpose()?;
    let patch = UserPatch {
        first_name: input.first_name,
        middle_name: input.middle_name,
        first_surname: input.first_surname,
        second_surname: input.second_surname,
        email,
        phone: input.phone,
        role_id: input.role_id,
        password_hash,
    };
    if patch.is_empty() {
        return Err(AccountsError::MissingData);
    }
    Ok(patch)
}

pub struct UpdateUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> UpdateUserUseCase<R> {
    pub async fn execute(&self, id: Uuid, input: UpdateUserInput) -> Result<(), AccountsError> {
        let patch = checked_patch(input)?;
        if let Some(email) = &patch.email {
            ensure_email_free(&self.repo, email, Some(id)).await?;
        }
        if !self.repo.update_by_id(id, &patch).await? {
            return Err(AccountsError::UserNotFound);
        }
        info!(user_id = %id, password_changed = patch.password_hash.is_some(), "user updated");
        Ok(())
    }
}

pub struct UpdateUsersUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> UpdateUsersUseCase<R> {
    /// Patch every user matching `filter`. Returns how many were updated.
    ///
    /// Email is unique, so a bulk patch may only set it when the filter
    /// targets at most one account. Matching nobody updates nothing.
    pub async fn execute(
        &self,
        filter: UserFilter,
        input: UpdateUserInput,
    ) -> Result<u64, AccountsError> {
        let filter = normalized_filter(filter);
        let patch = checked_patch(input)?;
        if let Some(email) = &patch.email {
            match self.repo.count(&filter).await? {
                0 => return Ok(0),
                1 => {}
                _ => return Err(AccountsError::UserAlreadyExists),
            }
            let owner = self.repo.find_one(&filter).await?.map(|u| u.id);
            ensure_email_free(&self.repo, email, owner).await?;
        }
        let count = self.repo.update_all(&filter, &patch).await?;
        info!(count, "users updated");
        Ok(count)
    }
}

// ── ReplaceUser / DeleteUser ─────────────────────────────────────────────────

pub struct ReplaceUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> ReplaceUserUseCase<R> {
    /// Overwrite every profile field. The password hash is left untouched.
    pub async fn execute(&self, id: Uuid, profile: UserProfile) -> Result<(), AccountsError> {
        let profile = checked_profile(profile)?;
        ensure_email_free(&self.repo, &profile.email, Some(id)).await?;
        if !self.repo.replace_by_id(id, &profile).await? {
            return Err(AccountsError::UserNotFound);
        }
        info!(user_id = %id, "user replaced");
        Ok(())
    }
}

pub struct DeleteUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> DeleteUserUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<(), AccountsError> {
        if !self.repo.delete_by_id(id).await? {
            return Err(AccountsError::UserNotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
