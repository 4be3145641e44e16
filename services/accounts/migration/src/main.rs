use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(keystone_accounts_migration::Migrator).await;
}
