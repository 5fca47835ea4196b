use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::types::{BookingType, Category, StringList};
use crate::{category_type, review, user};

/// Flat listing row shared by rentals, services and packages.
/// Columns that do not apply to `category` stay NULL / empty.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub category_type_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: Category,
    pub booking_type: BookingType,
    pub status: String,
    pub is_available: bool,
    pub price: Option<f64>,
    pub min_price: Option<f64>,
    pub pricing_unit: Option<String>,
    pub quantity: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub experience: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub career_highlight: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub education: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub images: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub locations: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub terms: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub offers: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub prices: StringList,
    pub next_available_date: Option<DateTimeWithTimeZone>,
    pub available_until: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Vendor, CategoryType, Review }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Vendor => Entity::belongs_to(user::Entity).from(Column::VendorId).to(user::Column::Id).into(),
            Relation::CategoryType => Entity::belongs_to(category_type::Entity)
                .from(Column::CategoryTypeId)
                .to(category_type::Column::Id)
                .into(),
            Relation::Review => Entity::has_many(review::Entity).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Vendor.def() }
}

impl Related<category_type::Entity> for Entity {
    fn to() -> RelationDef { Relation::CategoryType.def() }
}

impl Related<review::Entity> for Entity {
    fn to() -> RelationDef { Relation::Review.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub const DEFAULT_STATUS: &str = "ACTIVE";

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    if title.trim().is_empty() { return Err(errors::ModelError::Validation("title required".into())); }
    if title.len() > 200 { return Err(errors::ModelError::Validation("title too long (<=200)".into())); }
    Ok(())
}

pub fn validate_status(status: &str) -> Result<(), errors::ModelError> {
    if status.trim().is_empty() { return Err(errors::ModelError::Validation("status required".into())); }
    if status.len() > 32 { return Err(errors::ModelError::Validation("status too long (<=32)".into())); }
    Ok(())
}

pub fn validate_amount(field: &str, amount: f64) -> Result<(), errors::ModelError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(errors::ModelError::Validation(format!("{field} must be a non-negative number")));
    }
    Ok(())
}

pub fn validate_pricing_unit(unit: &str) -> Result<(), errors::ModelError> {
    if unit.trim().is_empty() || unit.len() > 32 {
        return Err(errors::ModelError::Validation("pricing unit must be 1..=32 characters".into()));
    }
    Ok(())
}
