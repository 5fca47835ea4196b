//! Create `item` table with FKs to `user` (vendor) and `category_type`.
//!
//! One flat row for rentals, services and packages; category-specific
//! columns are nullable. List-valued columns are JSONB arrays of strings.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Item::Table)
                    .if_not_exists()
                    .col(uuid(Item::Id).primary_key())
                    .col(uuid(Item::VendorId).not_null())
                    .col(uuid_null(Item::CategoryTypeId))
                    .col(string_len(Item::Title, 200).not_null())
                    .col(text(Item::Description).not_null())
                    .col(string_len(Item::Category, 16).not_null())
                    .col(string_len(Item::BookingType, 16).not_null())
                    .col(string_len(Item::Status, 32).not_null())
                    .col(boolean(Item::IsAvailable).not_null())
                    .col(double_null(Item::Price))
                    .col(double_null(Item::MinPrice))
                    .col(string_len_null(Item::PricingUnit, 32))
                    .col(integer_null(Item::Quantity))
                    .col(text_null(Item::Experience))
                    .col(text_null(Item::CareerHighlight))
                    .col(text_null(Item::Education))
                    .col(json_binary(Item::Images).not_null())
                    .col(json_binary(Item::Locations).not_null())
                    .col(json_binary(Item::Terms).not_null())
                    .col(json_binary(Item::Offers).not_null())
                    .col(json_binary(Item::Prices).not_null())
                    .col(timestamp_with_time_zone_null(Item::NextAvailableDate))
                    .col(timestamp_with_time_zone_null(Item::AvailableUntil))
                    .col(timestamp_with_time_zone(Item::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Item::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_vendor")
                            .from(Item::Table, Item::VendorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_category_type")
                            .from(Item::Table, Item::CategoryTypeId)
                            .to(CategoryType::Table, CategoryType::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Item::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Item {
    Table,
    Id,
    VendorId,
    CategoryTypeId,
    Title,
    Description,
    Category,
    BookingType,
    Status,
    IsAvailable,
    Price,
    MinPrice,
    PricingUnit,
    Quantity,
    Experience,
    CareerHighlight,
    Education,
    Images,
    Locations,
    Terms,
    Offers,
    Prices,
    NextAvailableDate,
    AvailableUntil,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum CategoryType { Table, Id }
