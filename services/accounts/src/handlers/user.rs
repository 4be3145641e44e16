use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keystone_domain::pagination::Window;

use crate::domain::types::{User, UserFilter, UserProfile};
use crate::error::AccountsError;
use crate::state::AppState;
use crate::usecase::user::{
    CountUsersUseCase, CreateUserUseCase, DeleteUserUseCase, GetUserUseCase, ListUsersUseCase,
    ReplaceUserUseCase, UpdateUserInput, UpdateUserUseCase, UpdateUsersUseCase,
};

/// Public view of a user. Carries no password material.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    #[serde(serialize_with = "keystone_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "keystone_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            middle_name: user.middle_name,
            first_surname: user.first_surname,
            second_surname: user.second_surname,
            email: user.email,
            phone: user.phone,
            role_id: user.role_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Full profile body for `POST /users` and `PUT /users/{id}`.
#[derive(Deserialize)]
pub struct UserProfileRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
}

impl From<UserProfileRequest> for UserProfile {
    fn from(body: UserProfileRequest) -> Self {
        Self {
            first_name: body.first_name,
            middle_name: body.middle_name,
            first_surname: body.first_surname,
            second_surname: body.second_surname,
            email: body.email,
            phone: body.phone,
            role_id: body.role_id,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
    pub password: Option<String>,
}

impl From<UpdateUserRequest> for UpdateUserInput {
    fn from(body: UpdateUserRequest) -> Self {
        Self {
            first_name: body.first_name,
            middle_name: body.middle_name,
            first_surname: body.first_surname,
            second_surname: body.second_surname,
            email: body.email,
            phone: body.phone,
            role_id: body.role_id,
            password: body.password,
        }
    }
}

/// Query string for list/count/bulk-update: exact-match filter fields plus `limit`/`skip`.
#[derive(Deserialize, Default)]
pub struct UserListQuery {
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub first_surname: Option<String>,
    pub phone: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl UserListQuery {
    fn filter(&self) -> UserFilter {
        UserFilter {
            email: self.email.clone(),
            role_id: self.role_id,
            first_name: self.first_name.clone(),
            first_surname: self.first_surname.clone(),
            phone: self.phone.clone(),
        }
    }

    fn window(&self) -> Window {
        let default = Window::default();
        Window {
            limit: self.limit.unwrap_or(default.limit),
            skip: self.skip.unwrap_or(default.skip),
        }
    }
}

fn parse_query(raw_query: Option<String>) -> Result<UserListQuery, AccountsError> {
    raw_query
        .as_deref()
        .map(serde_qs::from_str)
        .transpose()
        .map_err(|_| AccountsError::InvalidQuery)
        .map(Option::unwrap_or_default)
}

fn parse_id(raw: &str) -> Result<Uuid, AccountsError> {
    raw.parse().map_err(|_| AccountsError::UserNotFound)
}

// ── POST /users ──────────────────────────────────────────────────────────────

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<UserProfileRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AccountsError> {
    let usecase = CreateUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(body.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

// ── GET /users ───────────────────────────────────────────────────────────────

pub async fn list_users(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<UserResponse>>, AccountsError> {
    let query = parse_query(raw_query)?;
    let window = query.window();
    let usecase = ListUsersUseCase {
        repo: state.user_repo(),
    };
    let users = usecase.execute(query.filter(), window).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

// ── GET /users/count ─────────────────────────────────────────────────────────

pub async fn count_users(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<CountResponse>, AccountsError> {
    let query = parse_query(raw_query)?;
    let usecase = CountUsersUseCase {
        repo: state.user_repo(),
    };
    let count = usecase.execute(query.filter()).await?;
    Ok(Json(CountResponse { count }))
}

// ── PATCH /users ─────────────────────────────────────────────────────────────

pub async fn update_users(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<CountResponse>, AccountsError> {
    let query = parse_query(raw_query)?;
    let usecase = UpdateUsersUseCase {
        repo: state.user_repo(),
    };
    let count = usecase.execute(query.filter(), body.into()).await?;
    Ok(Json(CountResponse { count }))
}

// ── GET /users/{id} ──────────────────────────────────────────────────────────

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AccountsError> {
    let usecase = GetUserUseCase {
        repo: state.user_repo(),
    };
    let user = usecase.execute(parse_id(&id)?).await?;
    Ok(Json(user.into()))
}

// ── PATCH /users/{id} ────────────────────────────────────────────────────────

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<StatusCode, AccountsError> {
    let usecase = UpdateUserUseCase {
        repo: state.user_repo(),
    };
    usecase.execute(parse_id(&id)?, body.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── PUT /users/{id} ──────────────────────────────────────────────────────────

pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserProfileRequest>,
) -> Result<StatusCode, AccountsError> {
    let usecase = ReplaceUserUseCase {
        repo: state.user_repo(),
    };
    usecase.execute(parse_id(&id)?, body.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /users/{id} ───────────────────────────────────────────────────────

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AccountsError> {
    let usecase = DeleteUserUseCase {
        repo: state.user_repo(),
    };
    usecase.execute(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
