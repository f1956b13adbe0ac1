use sea_orm_migration::{prelude::*, schema::*};

use super::m20250612_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Garage::Table)
                    .if_not_exists()
                    .col(uuid(Garage::Id).primary_key())
                    .col(uuid(Garage::UserId).not_null().unique_key())
                    .col(string_len(Garage::Name, 100).not_null())
                    .col(string_len(Garage::Location, 255).not_null().default(""))
                    .col(string_len(Garage::Phone, 20).not_null().default(""))
                    .col(double(Garage::Commission).not_null())
                    .col(
                        timestamp_with_time_zone(Garage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_garage_user")
                            .from(Garage::Table, Garage::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Garage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Garage {
    Table,
    Id,
    UserId,
    Name,
    Location,
    Phone,
    Commission,
    CreatedAt,
}
