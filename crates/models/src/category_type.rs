use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::types::Category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub category: Category,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Item }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Item => Entity::has_many(crate::item::Entity).into() }
    }
}

impl Related<crate::item::Entity> for Entity {
    fn to() -> RelationDef { Relation::Item.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Trim and check a category-type name; returns the normalized name.
pub fn normalize_name(name: &str) -> Result<String, errors::ModelError> {
    let name = name.trim();
    if name.is_empty() { return Err(errors::ModelError::Validation("category type name required".into())); }
    if name.len() > 128 { return Err(errors::ModelError::Validation("category type name too long (<=128)".into())); }
    Ok(name.to_string())
}

/// Fresh active model for an insert; the caller decides how conflicts are handled.
pub fn new_active_model(name: &str, category: Category) -> Result<ActiveModel, errors::ModelError> {
    let name = normalize_name(name)?;
    let now = Utc::now().into();
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        category: Set(category),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
