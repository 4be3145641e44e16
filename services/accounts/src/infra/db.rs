use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
    TransactionError, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use keystone_accounts_schema::{logins, outbox_events, users};
use keystone_core::sea_ext::SelectWindow;
use keystone_domain::pagination::Window;

use crate::domain::repository::{LoginRepository, UserRepository};
use crate::domain::types::{LoginRecord, OutboxEvent, User, UserFilter, UserPatch, UserProfile};
use crate::error::AccountsError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

fn user_condition(filter: &UserFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(email) = &filter.email {
        cond = cond.add(users::Column::Email.eq(email.clone()));
    }
    if let Some(role_id) = filter.role_id {
        cond = cond.add(users::Column::RoleId.eq(role_id));
    }
    if let Some(first_name) = &filter.first_name {
        cond = cond.add(users::Column::FirstName.eq(first_name.clone()));
    }
    if let Some(first_surname) = &filter.first_surname {
        cond = cond.add(users::Column::FirstSurname.eq(first_surname.clone()));
    }
    if let Some(phone) = &filter.phone {
        cond = cond.add(users::Column::Phone.eq(phone.clone()));
    }
    cond
}

/// A write that trips the unique email index lost a race with another
/// request for the same address.
fn user_write_error(err: DbErr, action: &'static str) -> AccountsError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return AccountsError::UserAlreadyExists;
    }
    AccountsError::Internal(anyhow::Error::new(err).context(action))
}

/// Active model carrying only the patched columns plus `updated_at`.
fn patch_active_model(patch: &UserPatch) -> users::ActiveModel {
    let mut am = <users::ActiveModel as Default>::default();
    if let Some(v) = &patch.first_name {
        am.first_name = Set(v.clone());
    }
    if let Some(v) = &patch.middle_name {
        am.middle_name = Set(Some(v.clone()));
    }
    if let Some(v) = &patch.first_surname {
        am.first_surname = Set(v.clone());
    }
    if let Some(v) = &patch.second_surname {
        am.second_surname = Set(Some(v.clone()));
    }
    if let Some(v) = &patch.email {
        am.email = Set(v.clone());
    }
    if let Some(v) = &patch.phone {
        am.phone = Set(Some(v.clone()));
    }
    if let Some(v) = patch.role_id {
        am.role_id = Set(v);
    }
    if let Some(v) = &patch.password_hash {
        am.password_hash = Set(v.clone());
    }
    am.updated_at = Set(Utc::now());
    am
}

impl UserRepository for DbUserRepository {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, AccountsError> {
        let model = users::Entity::find()
            .filter(user_condition(filter))
            .order_by_asc(users::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find one user")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AccountsError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find(
        &self,
        filter: &UserFilter,
        window: Window,
    ) -> Result<Vec<User>, AccountsError> {
        let models = users::Entity::find()
            .filter(user_condition(filter))
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .window(window)
            .all(&self.db)
            .await
            .context("find users")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, AccountsError> {
        let count = users::Entity::find()
            .filter(user_condition(filter))
            .count(&self.db)
            .await
            .context("count users")?;
        Ok(count)
    }

    async fn create_with_outbox(
        &self,
        user: &User,
        event: &OutboxEvent,
    ) -> Result<(), AccountsError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let user = user.clone();
                let event = event.clone();
                Box::pin(async move {
                    insert_user(txn, &user).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) | TransactionError::Transaction(e) => {
                    user_write_error(e, "create user with outbox")
                }
            })?;
        Ok(())
    }

    async fn update_by_id(&self, id: Uuid, patch: &UserPatch) -> Result<bool, AccountsError> {
        let result = users::Entity::update_many()
            .set(patch_active_model(patch))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| user_write_error(e, "update user by id"))?;
        Ok(result.rows_affected > 0)
    }

    async fn update_all(
        &self,
        filter: &UserFilter,
        patch: &UserPatch,
    ) -> Result<u64, AccountsError> {
        let result = users::Entity::update_many()
            .set(patch_active_model(patch))
            .filter(user_condition(filter))
            .exec(&self.db)
            .await
            .map_err(|e| user_write_error(e, "update users"))?;
        Ok(result.rows_affected)
    }

    async fn replace_by_id(&self, id: Uuid, profile: &UserProfile) -> Result<bool, AccountsError> {
        let am = users::ActiveModel {
            first_name: Set(profile.first_name.clone()),
            middle_name: Set(profile.middle_name.clone()),
            first_surname: Set(profile.first_surname.clone()),
            second_surname: Set(profile.second_surname.clone()),
            email: Set(profile.email.clone()),
            phone: Set(profile.phone.clone()),
            role_id: Set(profile.role_id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        let result = users::Entity::update_many()
            .set(am)
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| user_write_error(e, "replace user"))?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AccountsError> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete user")?;
        Ok(result.rows_affected > 0)
    }
}

async fn insert_user(txn: &DatabaseTransaction, user: &User) -> Result<(), sea_orm::DbErr> {
    users::ActiveModel {
        id: Set(user.id),
        first_name: Set(user.first_name.clone()),
        middle_name: Set(user.middle_name.clone()),
        first_surname: Set(user.first_surname.clone()),
        second_surname: Set(user.second_surname.clone()),
        email: Set(user.email.clone()),
        phone: Set(user.phone.clone()),
        role_id: Set(user.role_id),
        password_hash: Set(user.password_hash.clone()),
        created_at: Set(user.created_at),
        updated_at: Set(user.updated_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        first_name: model.first_name,
        middle_name: model.middle_name,
        first_surname: model.first_surname,
        second_surname: model.second_surname,
        email: model.email,
        phone: model.phone,
        role_id: model.role_id,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Login repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLoginRepository {
    pub db: DatabaseConnection,
}

impl LoginRepository for DbLoginRepository {
    async fn count_active(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AccountsError> {
        let count = logins::Entity::find()
            .filter(logins::Column::UserId.eq(user_id))
            .filter(logins::Column::CodeConsumed.eq(false))
            .filter(logins::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await
            .context("count active login codes")?;
        Ok(count)
    }

    async fn create_with_outbox(
        &self,
        login: &LoginRecord,
        event: &OutboxEvent,
    ) -> Result<(), AccountsError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let login = login.clone();
                let event = event.clone();
                Box::pin(async move {
                    insert_login(txn, &login).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .context("create login with outbox")?;
        Ok(())
    }

    async fn find_redeemable(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginRecord>, AccountsError> {
        let model = logins::Entity::find()
            .filter(logins::Column::UserId.eq(user_id))
            .filter(logins::Column::Code.eq(code))
            .filter(logins::Column::CodeConsumed.eq(false))
            .filter(logins::Column::ExpiresAt.gt(now))
            .order_by_desc(logins::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find redeemable login")?;
        Ok(model.map(login_from_model))
    }

    async fn redeem(
        &self,
        id: Uuid,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsError> {
        // Single conditional UPDATE: concurrent redeemers race on the
        // code_consumed guard and exactly one sees rows_affected = 1.
        let result = logins::Entity::update_many()
            .col_expr(logins::Column::CodeConsumed, Expr::value(true))
            .col_expr(logins::Column::Token, Expr::value(token.to_owned()))
            .col_expr(logins::Column::ConsumedAt, Expr::value(now))
            .filter(logins::Column::Id.eq(id))
            .filter(logins::Column::CodeConsumed.eq(false))
            .exec(&self.db)
            .await
            .context("redeem login code")?;
        Ok(result.rows_affected == 1)
    }
}

async fn insert_login(txn: &DatabaseTransaction, login: &LoginRecord) -> Result<(), sea_orm::DbErr> {
    logins::ActiveModel {
        id: Set(login.id),
        user_id: Set(login.user_id),
        code: Set(login.code.clone()),
        code_consumed: Set(login.code_consumed),
        token: Set(login.token.clone()),
        token_consumed: Set(login.token_consumed),
        expires_at: Set(login.expires_at),
        created_at: Set(login.created_at),
        consumed_at: Set(login.consumed_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn login_from_model(model: logins::Model) -> LoginRecord {
    LoginRecord {
        id: model.id,
        user_id: model.user_id,
        code: model.code,
        code_consumed: model.code_consumed,
        token: model.token,
        token_consumed: model.token_consumed,
        expires_at: model.expires_at,
        created_at: model.created_at,
        consumed_at: model.consumed_at,
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        user_id: Set(event.user_id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}
