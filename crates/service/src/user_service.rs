use uuid::Uuid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use tracing::{info, instrument};

use models::{types::UserRole, user};
use crate::{errors::ServiceError, pagination::{PageRequest, Paginated}};

/// Create a new user with the given role.
#[instrument(skip(db))]
pub async fn create_user(db: &DatabaseConnection, email: &str, name: &str, role: UserRole) -> Result<user::Model, ServiceError> {
    let created = user::create(db, email, name, role).await?;
    info!(user_id = %created.id, role = ?created.role, "user_created");
    Ok(created)
}

/// Get a user by id.
pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))
}

/// Update a user's name.
pub async fn update_user_name(db: &DatabaseConnection, id: Uuid, name: &str) -> Result<user::Model, ServiceError> {
    user::validate_name(name)?;
    let mut am: user::ActiveModel = get_user(db, id).await?.into();
    am.name = Set(name.trim().to_string());
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Delete a user; their listings and reviews go with them.
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    if !user::hard_delete(db, id).await? {
        return Err(ServiceError::not_found("user"));
    }
    info!(user_id = %id, "user_deleted");
    Ok(())
}

/// List users, optionally by role, newest first; `total` is a separate count.
pub async fn list_users_paginated(
    db: &DatabaseConnection,
    role: Option<UserRole>,
    page: PageRequest,
) -> Result<Paginated<user::Model>, ServiceError> {
    let window = page.window()?;
    let mut q = user::Entity::find();
    if let Some(role) = role {
        q = q.filter(user::Column::Role.eq(role));
    }
    let total = q.clone().count(db).await?;
    let users = q
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .offset(window.skip)
        .limit(window.take)
        .all(db)
        .await?;
    Ok(Paginated::new(users, total, page))
}
