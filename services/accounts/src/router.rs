use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower::ServiceBuilder;

use keystone_core::health::{database_ready, healthz};
use keystone_core::middleware::{
    http_trace_layer, propagate_request_id_layer, request_id_layer,
};

use crate::handlers::{
    auth::{check_token, identify, verify_2fa},
    user::{
        count_users, create_user, delete_user, get_user, list_users, replace_user, update_user,
        update_users,
    },
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    database_ready(&state.db).await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Users
        .route(
            "/users",
            post(create_user).get(list_users).patch(update_users),
        )
        .route("/users/count", get(count_users))
        .route(
            "/users/{id}",
            get(get_user)
                .patch(update_user)
                .put(replace_user)
                .delete(delete_user),
        )
        // Auth
        .route("/auth/identify", post(identify))
        .route("/auth/verify-2fa", post(verify_2fa))
        .route("/auth/token", get(check_token))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(http_trace_layer())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
