use sea_orm::DatabaseConnection;

use crate::infra::db::{DbLoginRepository, DbUserRepository};
use crate::usecase::token::TokenIssuer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub tokens: TokenIssuer,
    pub login_code_ttl_secs: i64,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn login_repo(&self) -> DbLoginRepository {
        DbLoginRepository {
            db: self.db.clone(),
        }
    }
}
