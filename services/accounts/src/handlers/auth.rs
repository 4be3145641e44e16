use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{CodeChallenge, Credentials};
use crate::error::AccountsError;
use crate::handlers::user::UserResponse;
use crate::state::AppState;
use crate::usecase::auth::{
    CheckTokenUseCase, IdentifyUseCase, VerifyCodeUseCase, parse_challenge_user_id,
};

// ── POST /auth/identify ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IdentifyRequest {
    pub email: String,
    pub password: String,
}

pub async fn identify(
    State(state): State<AppState>,
    Json(body): Json<IdentifyRequest>,
) -> Result<Json<UserResponse>, AccountsError> {
    let usecase = IdentifyUseCase {
        users: state.user_repo(),
        logins: state.login_repo(),
        code_ttl_secs: state.login_code_ttl_secs,
    };
    let user = usecase
        .execute(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(Json(user.into()))
}

// ── POST /auth/verify-2fa ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub user_id: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub user: UserResponse,
    pub token: String,
    #[serde(serialize_with = "keystone_core::serde::epoch_secs_to_rfc3339")]
    pub expires_at: u64,
}

pub async fn verify_2fa(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AccountsError> {
    let challenge = CodeChallenge {
        user_id: parse_challenge_user_id(&body.user_id)?,
        code: body.code,
    };
    let usecase = VerifyCodeUseCase {
        users: state.user_repo(),
        logins: state.login_repo(),
        tokens: state.tokens.clone(),
    };
    let output = usecase.execute(challenge).await?;
    Ok(Json(VerifyCodeResponse {
        user: output.user.into(),
        token: output.token.token,
        expires_at: output.token.expires_at,
    }))
}

// ── GET /auth/token ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CheckTokenResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: Uuid,
    #[serde(serialize_with = "keystone_core::serde::epoch_secs_to_rfc3339")]
    pub expires_at: u64,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn check_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CheckTokenResponse>, AccountsError> {
    let token = bearer_token(&headers).ok_or(AccountsError::InvalidToken)?;
    let usecase = CheckTokenUseCase {
        tokens: state.tokens.clone(),
    };
    let info = usecase.execute(token)?;
    Ok(Json(CheckTokenResponse {
        user_id: info.user_id,
        name: info.name,
        email: info.email,
        role_id: info.role_id,
        expires_at: info.expires_at,
    }))
}
