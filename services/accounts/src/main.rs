use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use keystone_accounts::config::AccountsConfig;
use keystone_accounts::router::build_router;
use keystone_accounts::state::AppState;
use keystone_accounts::usecase::token::TokenIssuer;
use keystone_core::config::Config;
use keystone_core::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AccountsConfig::from_env().context("load accounts configuration")?;
    config.validate().context("invalid accounts configuration")?;
    init_tracing(config.log_format);

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let state = AppState {
        db,
        tokens: TokenIssuer::new(config.jwt_secret, config.access_token_ttl_secs),
        login_code_ttl_secs: config.login_code_ttl_secs,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.accounts_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("accounts service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
