use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Item: listings of one vendor
        manager
            .create_index(
                Index::create()
                    .name("idx_item_vendor")
                    .table(Item::Table)
                    .col(Item::VendorId)
                    .to_owned(),
            )
            .await?;

        // Item: category browse in listing order (created_at desc, id desc)
        manager
            .create_index(
                Index::create()
                    .name("idx_item_category_created")
                    .table(Item::Table)
                    .col(Item::Category)
                    .col(Item::CreatedAt)
                    .col(Item::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_item_category_type")
                    .table(Item::Table)
                    .col(Item::CategoryTypeId)
                    .to_owned(),
            )
            .await?;

        // Review: aggregation per item
        manager
            .create_index(
                Index::create()
                    .name("idx_review_item")
                    .table(Review::Table)
                    .col(Review::ItemId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_item_vendor").table(Item::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_item_category_created").table(Item::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_item_category_type").table(Item::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_review_item").table(Review::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Item { Table, VendorId, Category, CategoryTypeId, CreatedAt, Id }

#[derive(DeriveIden)]
enum Review { Table, ItemId }
