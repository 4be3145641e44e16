use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key on user_id: login rows are an audit trail and outlive deleted users.
        manager
            .create_table(
                Table::create()
                    .table(Logins::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Logins::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Logins::UserId).uuid().not_null())
                    .col(ColumnDef::new(Logins::Code).string().not_null())
                    .col(
                        ColumnDef::new(Logins::CodeConsumed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Logins::Token)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Logins::TokenConsumed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Logins::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Logins::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Logins::ConsumedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Logins::Table)
                    .col(Logins::UserId)
                    .col(Logins::Code)
                    .name("idx_logins_user_id_code")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Logins::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Logins {
    Table,
    Id,
    UserId,
    Code,
    CodeConsumed,
    Token,
    TokenConsumed,
    ExpiresAt,
    CreatedAt,
    ConsumedAt,
}
