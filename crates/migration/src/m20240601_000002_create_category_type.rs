//! Create `category_type` table.
//!
//! Deduplicated lookup of listing sub-classifications; `name` is the dedup key.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CategoryType::Table)
                    .if_not_exists()
                    .col(uuid(CategoryType::Id).primary_key())
                    .col(string_len(CategoryType::Name, 128).unique_key().not_null())
                    .col(string_len(CategoryType::Category, 16).not_null())
                    .col(timestamp_with_time_zone(CategoryType::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CategoryType::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CategoryType::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CategoryType { Table, Id, Name, Category, CreatedAt, UpdatedAt }
