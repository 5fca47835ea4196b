use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};
use uuid::Uuid;

use models::types::StringList;
use models::{category_type, item, review, user};

use crate::catalog::domain::{
    Category, CategoryType, Listing, ListingFilter, ListingHead, ListingPatch, VendorSummary,
};
use crate::catalog::repository::{CatalogRepository, NewReview};
use crate::errors::StoreError;
use crate::pagination::Window;

pub struct SeaOrmCatalogRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') { out.push('\\'); }
        out.push(ch);
    }
    out
}

fn filtered(filter: &ListingFilter) -> Select<item::Entity> {
    let mut q = item::Entity::find();
    if let Some(category) = filter.category {
        q = q.filter(item::Column::Category.eq(category));
    }
    if let Some(vendor_id) = filter.vendor_id {
        q = q.filter(item::Column::VendorId.eq(vendor_id));
    }
    if let Some(name) = &filter.category_type {
        q = q.filter(
            item::Column::CategoryTypeId.in_subquery(
                Query::select()
                    .column(category_type::Column::Id)
                    .from(category_type::Entity)
                    .and_where(category_type::Column::Name.eq(name.trim()))
                    .to_owned(),
            ),
        );
    }
    if let Some(range) = filter.available {
        q = q
            .filter(item::Column::IsAvailable.eq(true))
            .filter(
                Condition::any()
                    .add(item::Column::NextAvailableDate.is_null())
                    .add(item::Column::NextAvailableDate.lte(range.to)),
            )
            .filter(
                Condition::any()
                    .add(item::Column::AvailableUntil.is_null())
                    .add(item::Column::AvailableUntil.gte(range.from)),
            );
    }
    if let Some(location) = &filter.location {
        let pattern = format!("%{}%", escape_like(location.trim()));
        q = q.filter(Expr::cust_with_values(
            r#"EXISTS (SELECT 1 FROM jsonb_array_elements_text("item"."locations") AS loc WHERE loc ILIKE $1)"#,
            [pattern],
        ));
    }
    q
}

fn to_active_model(listing: &Listing) -> item::ActiveModel {
    let c = listing.details.columns();
    item::ActiveModel {
        id: Set(listing.id),
        vendor_id: Set(listing.vendor_id),
        category_type_id: Set(listing.category_type_id),
        title: Set(listing.title.clone()),
        description: Set(listing.description.clone()),
        category: Set(listing.category()),
        booking_type: Set(listing.booking_type),
        status: Set(listing.status.clone()),
        is_available: Set(listing.is_available),
        price: Set(c.price),
        min_price: Set(c.min_price),
        pricing_unit: Set(c.pricing_unit),
        quantity: Set(c.quantity),
        experience: Set(c.experience),
        career_highlight: Set(c.career_highlight),
        education: Set(c.education),
        images: Set(StringList(listing.images.clone())),
        locations: Set(StringList(listing.locations.clone())),
        terms: Set(StringList(c.terms)),
        offers: Set(StringList(c.offers)),
        prices: Set(StringList(c.prices)),
        next_available_date: Set(listing.next_available_date),
        available_until: Set(listing.available_until),
        created_at: Set(listing.created_at),
        updated_at: Set(listing.updated_at),
    }
}

/// Only the columns the patch touches are `Set`; the rest stay `NotSet`.
fn patch_active_model(patch: &ListingPatch, category_type_id: Option<Uuid>) -> item::ActiveModel {
    let mut am = item::ActiveModel { updated_at: Set(Utc::now().into()), ..Default::default() };
    if let Some(title) = &patch.title { am.title = Set(title.trim().to_string()); }
    if let Some(description) = &patch.description { am.description = Set(description.clone()); }
    if let Some(booking_type) = patch.booking_type { am.booking_type = Set(booking_type); }
    if let Some(is_available) = patch.is_available { am.is_available = Set(is_available); }
    if let Some(images) = &patch.images { am.images = Set(StringList(images.clone())); }
    if let Some(locations) = &patch.locations { am.locations = Set(StringList(locations.clone())); }
    if let Some(date) = patch.next_available_date { am.next_available_date = Set(date); }
    if let Some(date) = patch.available_until { am.available_until = Set(date); }
    if let Some(details) = &patch.details {
        // rewrite every detail column so fields of a previous category are cleared
        let c = details.columns();
        am.category = Set(details.category());
        am.price = Set(c.price);
        am.min_price = Set(c.min_price);
        am.pricing_unit = Set(c.pricing_unit);
        am.quantity = Set(c.quantity);
        am.experience = Set(c.experience);
        am.career_highlight = Set(c.career_highlight);
        am.education = Set(c.education);
        am.terms = Set(StringList(c.terms));
        am.offers = Set(StringList(c.offers));
        am.prices = Set(StringList(c.prices));
    }
    if let Some(ct_id) = category_type_id { am.category_type_id = Set(Some(ct_id)); }
    am
}

#[async_trait::async_trait]
impl CatalogRepository for SeaOrmCatalogRepository {
    async fn find_category_type(&self, name: &str) -> Result<Option<CategoryType>, StoreError> {
        let found = category_type::find_by_name(&self.db, name).await?;
        Ok(found.map(CategoryType::from))
    }

    async fn insert_category_type(&self, name: &str, category: Category) -> Result<CategoryType, StoreError> {
        let am = category_type::new_active_model(name, category)?;
        let res = category_type::Entity::insert(am)
            .on_conflict(OnConflict::column(category_type::Column::Name).do_nothing().to_owned())
            .exec(&self.db)
            .await;
        match res {
            // RecordNotInserted: a concurrent insert won, the refetch below returns its row
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }
        category_type::find_by_name(&self.db, name)
            .await?
            .map(CategoryType::from)
            .ok_or_else(|| StoreError::Backend(format!("category type {name:?} missing after insert")))
    }

    async fn list_category_types(&self, category: Option<Category>) -> Result<Vec<CategoryType>, StoreError> {
        let mut q = category_type::Entity::find().order_by_asc(category_type::Column::Name);
        if let Some(category) = category {
            q = q.filter(category_type::Column::Category.eq(category));
        }
        let rows = q.all(&self.db).await?;
        Ok(rows.into_iter().map(CategoryType::from).collect())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<VendorSummary>, StoreError> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let rows = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(VendorSummary::from).collect())
    }

    async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        item::Entity::insert(to_active_model(listing)).exec(&self.db).await?;
        Ok(())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let row = item::Entity::find_by_id(id)
            .find_also_related(category_type::Entity)
            .one(&self.db)
            .await?;
        Ok(row.map(|(m, ct)| Listing::from_row(m, ct.map(|c| c.name))))
    }

    async fn listing_head(&self, id: Uuid) -> Result<Option<ListingHead>, StoreError> {
        let row = item::Entity::find_by_id(id)
            .select_only()
            .column(item::Column::Id)
            .column(item::Column::VendorId)
            .column(item::Column::Category)
            .into_tuple::<(Uuid, Uuid, Category)>()
            .one(&self.db)
            .await?;
        Ok(row.map(|(id, vendor_id, category)| ListingHead { id, vendor_id, category }))
    }

    async fn count_listings(&self, filter: &ListingFilter) -> Result<u64, StoreError> {
        Ok(filtered(filter).count(&self.db).await?)
    }

    async fn find_listings(&self, filter: &ListingFilter, window: Window) -> Result<Vec<Listing>, StoreError> {
        let rows = filtered(filter)
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .offset(window.skip)
            .limit(window.take)
            .find_also_related(category_type::Entity)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|(m, ct)| Listing::from_row(m, ct.map(|c| c.name))).collect())
    }

    async fn update_listing(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        patch: &ListingPatch,
        category_type_id: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let mut q = item::Entity::update_many()
            .set(patch_active_model(patch, category_type_id))
            .filter(item::Column::Id.eq(id));
        if let Some(owner) = owner {
            q = q.filter(item::Column::VendorId.eq(owner));
        }
        let res = q.exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn set_listing_status(&self, id: Uuid, status: &str) -> Result<bool, StoreError> {
        let now: chrono::DateTime<chrono::FixedOffset> = Utc::now().into();
        let res = item::Entity::update_many()
            .col_expr(item::Column::Status, Expr::value(status.to_string()))
            .col_expr(item::Column::UpdatedAt, Expr::value(now))
            .filter(item::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_listing(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, StoreError> {
        let mut q = item::Entity::delete_many().filter(item::Column::Id.eq(id));
        if let Some(owner) = owner {
            q = q.filter(item::Column::VendorId.eq(owner));
        }
        let res = q.exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn ratings_for(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<i32>>, StoreError> {
        if item_ids.is_empty() { return Ok(HashMap::new()); }
        let rows = review::Entity::find()
            .select_only()
            .column(review::Column::ItemId)
            .column(review::Column::Rating)
            .filter(review::Column::ItemId.is_in(item_ids.to_vec()))
            .into_tuple::<(Uuid, i32)>()
            .all(&self.db)
            .await?;
        let mut out: HashMap<Uuid, Vec<i32>> = HashMap::new();
        for (item_id, rating) in rows {
            out.entry(item_id).or_default().push(rating);
        }
        Ok(out)
    }

    async fn insert_review(&self, r: NewReview) -> Result<Uuid, StoreError> {
        let created = review::create(&self.db, r.item_id, r.vendor_id, r.reviewer_id, r.rating, &r.comment).await?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{owned_by, BookingType, DateRange, ListingDetails, NewListing, RentalDetails, UserRole};
    use crate::catalog::service::CatalogService;
    use crate::pagination::PageRequest;
    use crate::test_support::{get_db, skip_db_tests};
    use std::sync::Arc;
    use chrono::{Duration, TimeZone};

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Lagos"), "Lagos");
    }

    #[test]
    fn patch_leaves_untouched_columns_unset() {
        let patch = ListingPatch { title: Some(" New ".into()), ..Default::default() };
        let am = patch_active_model(&patch, None);
        assert_eq!(am.title, Set("New".to_string()));
        assert!(am.price.is_not_set());
        assert!(am.category_type_id.is_not_set());
    }

    fn listing(vendor_id: Uuid, ct: &CategoryType, location: &str) -> Listing {
        let now = Utc::now().into();
        Listing {
            id: Uuid::new_v4(),
            vendor_id,
            category_type_id: Some(ct.id),
            category_type: Some(ct.name.clone()),
            title: "Camping tent".into(),
            description: "Four person tent".into(),
            booking_type: BookingType::Instant,
            status: "ACTIVE".into(),
            is_available: true,
            images: vec![],
            locations: vec![location.to_string()],
            next_available_date: Some(Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap().into()),
            available_until: Some(Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap().into()),
            details: ListingDetails::Rental(RentalDetails { price: 25.0, pricing_unit: Some("day".into()), quantity: 3, terms: vec![] }),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn seaorm_catalog_roundtrip() -> Result<(), anyhow::Error> {
        if skip_db_tests() { return Ok(()); }
        let db = get_db().await?;
        let repo = SeaOrmCatalogRepository::new(db.clone());

        let vendor = user::create(&db, &format!("v_{}@example.com", Uuid::new_v4()), "Vendor", UserRole::Vendor).await?;
        let name = format!("Tents {}", Uuid::new_v4());
        let (a, b) = tokio::join!(
            repo.insert_category_type(&name, Category::Rentals),
            repo.insert_category_type(&name, Category::Rentals)
        );
        let (a, b) = (a?, b?);
        assert_eq!(a.id, b.id);

        let town = format!("Ikeja_{}", Uuid::new_v4().simple());
        let l = listing(vendor.id, &a, &format!("{town}, Lagos"));
        repo.insert_listing(&l).await?;

        let fetched = repo.find_listing(l.id).await?.expect("listing stored");
        assert_eq!(fetched.details, l.details);
        assert_eq!(fetched.category_type.as_deref(), Some(name.as_str()));

        let by_location = ListingFilter { location: Some(town.to_lowercase()), ..Default::default() };
        assert_eq!(repo.count_listings(&by_location).await?, 1);
        let by_type = ListingFilter { category_type: Some(name.clone()), ..Default::default() };
        let page = repo.find_listings(&by_type, Window { skip: 0, take: 10 }).await?;
        assert_eq!(page.len(), 1);

        let from = l.available_until.unwrap() + Duration::days(1);
        let outside = ListingFilter {
            vendor_id: Some(vendor.id),
            available: Some(DateRange { from, to: from + Duration::days(3) }),
            ..Default::default()
        };
        assert_eq!(repo.count_listings(&outside).await?, 0);

        // wrong owner matches no row
        let patch = ListingPatch { title: Some("Renamed".into()), ..Default::default() };
        assert!(!repo.update_listing(l.id, Some(Uuid::new_v4()), &patch, None).await?);
        assert!(repo.update_listing(l.id, Some(vendor.id), &patch, None).await?);
        assert!(repo.set_listing_status(l.id, "PAUSED").await?);

        let buyer = user::create(&db, &format!("b_{}@example.com", Uuid::new_v4()), "Buyer", UserRole::Buyer).await?;
        for rating in [5, 4] {
            repo.insert_review(NewReview { item_id: l.id, vendor_id: vendor.id, reviewer_id: buyer.id, rating, comment: "ok".into() }).await?;
        }
        let ratings = repo.ratings_for(&[l.id]).await?;
        assert_eq!(ratings.get(&l.id).map(Vec::len), Some(2));

        assert!(repo.delete_listing(l.id, Some(vendor.id)).await?);
        assert!(repo.find_listing(l.id).await?.is_none());
        assert!(!repo.delete_listing(l.id, None).await?);

        user::hard_delete(&db, buyer.id).await?;
        user::hard_delete(&db, vendor.id).await?;
        category_type::Entity::delete_by_id(a.id).exec(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn service_filters_by_location_on_postgres() -> Result<(), anyhow::Error> {
        if skip_db_tests() { return Ok(()); }
        let db = get_db().await?;
        let svc = CatalogService::new(Arc::new(SeaOrmCatalogRepository::new(db.clone())));

        let vendor = user::create(&db, &format!("v_{}@example.com", Uuid::new_v4()), "Vendor", UserRole::Vendor).await?;
        let type_name = format!("Canoes {}", Uuid::new_v4());
        let town = format!("Lekki_{}", Uuid::new_v4().simple());
        let new_listing = |title: &str, location: String| NewListing {
            title: title.into(),
            description: "rental".into(),
            category_type: type_name.clone(),
            booking_type: BookingType::Request,
            status: None,
            is_available: true,
            images: vec![],
            locations: vec!["Abuja".into(), location],
            next_available_date: None,
            available_until: None,
            details: ListingDetails::Rental(RentalDetails { price: 40.0, pricing_unit: None, quantity: 1, terms: vec![] }),
        };
        let near = svc.create(vendor.id, new_listing("Canoe", format!("{town} Phase 1, Lagos"))).await?;
        svc.create(vendor.id, new_listing("Kayak", "Ikoyi, Lagos".into())).await?;

        let filter = ListingFilter { location: Some(format!("  {}  ", town.to_uppercase())), ..Default::default() };
        let page = svc.list(&filter, PageRequest::new(1, 10)).await?;
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data.iter().map(|v| v.id).collect::<Vec<_>>(), vec![near]);

        let by_vendor = ListingFilter { vendor_id: Some(vendor.id), ..Default::default() };
        assert_eq!(svc.list(&by_vendor, PageRequest::new(1, 10)).await?.meta.total, 2);
        svc.delete(near, &owned_by(vendor.id)).await?;
        assert_eq!(svc.list(&filter, PageRequest::new(1, 10)).await?.meta.total, 0);

        user::hard_delete(&db, vendor.id).await?;
        if let Some(ct) = category_type::find_by_name(&db, &type_name).await? {
            category_type::Entity::delete_by_id(ct.id).exec(&db).await?;
        }
        Ok(())
    }
}
