use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, item, user};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub vendor_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Item, Vendor, Reviewer }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Item => Entity::belongs_to(item::Entity).from(Column::ItemId).to(item::Column::Id).into(),
            Relation::Vendor => Entity::belongs_to(user::Entity).from(Column::VendorId).to(user::Column::Id).into(),
            Relation::Reviewer => Entity::belongs_to(user::Entity).from(Column::ReviewerId).to(user::Column::Id).into(),
        }
    }
}

impl Related<item::Entity> for Entity {
    fn to() -> RelationDef { Relation::Item.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_rating(rating: i32) -> Result<(), errors::ModelError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(errors::ModelError::Validation(format!("rating must be between {MIN_RATING} and {MAX_RATING}")));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    item_id: Uuid,
    vendor_id: Uuid,
    reviewer_id: Uuid,
    rating: i32,
    comment: &str,
) -> Result<Model, errors::ModelError> {
    validate_rating(rating)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item_id),
        vendor_id: Set(vendor_id),
        reviewer_id: Set(reviewer_id),
        rating: Set(rating),
        comment: Set(comment.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
