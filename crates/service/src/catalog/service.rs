use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use models::{category_type, item, review};

use super::domain::{
    Authorize, Category, CategoryType, Listing, ListingFilter, ListingPatch, ListingView, NewListing, UserRole,
    VendorSummary,
};
use super::rating::{self, RatingSummary};
use super::repository::{CatalogRepository, NewReview};
use crate::errors::{ServiceError, StoreError};
use crate::pagination::{PageRequest, Paginated};

/// Catalog business service independent of any transport.
pub struct CatalogService<R: CatalogRepository> {
    repo: Arc<R>,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }

    /// Find the category type by name, creating it on first use.
    ///
    /// An existing type is returned as-is even when its parent category
    /// differs from `category`.
    #[instrument(skip(self))]
    pub async fn resolve_category_type(&self, name: &str, category: Category) -> Result<CategoryType, ServiceError> {
        let name = category_type::normalize_name(name)?;
        if let Some(found) = self.repo.find_category_type(&name).await? {
            return Ok(found);
        }
        match self.repo.insert_category_type(&name, category).await {
            Ok(created) => {
                info!(category_type_id = %created.id, name = %created.name, "category_type_created");
                Ok(created)
            }
            Err(StoreError::UniqueViolation(_)) => {
                debug!(name = %name, "lost category type insert race, refetching");
                self.repo
                    .find_category_type(&name)
                    .await?
                    .ok_or_else(|| ServiceError::Store(StoreError::Backend(format!("category type {name:?} vanished after conflict"))))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Category types ordered by name, optionally restricted to one category.
    pub async fn category_types(&self, category: Option<Category>) -> Result<Vec<CategoryType>, ServiceError> {
        Ok(self.repo.list_category_types(category).await?)
    }

    /// Create a listing owned by `vendor_id`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::catalog::{CatalogService, repository::mock::MemoryCatalogRepository};
    /// use service::catalog::domain::{BookingType, ListingDetails, NewListing, RentalDetails, UserRole};
    /// let repo = Arc::new(MemoryCatalogRepository::new());
    /// let vendor = tokio_test::block_on(repo.add_user("Ada", UserRole::Vendor));
    /// let svc = CatalogService::new(repo);
    /// let input = NewListing {
    ///     title: "Camping tent".into(),
    ///     description: String::new(),
    ///     category_type: "Tents".into(),
    ///     booking_type: BookingType::Instant,
    ///     status: None,
    ///     is_available: true,
    ///     images: vec![],
    ///     locations: vec!["Lagos".into()],
    ///     next_available_date: None,
    ///     available_until: None,
    ///     details: ListingDetails::Rental(RentalDetails { price: 25.0, pricing_unit: None, quantity: 2, terms: vec![] }),
    /// };
    /// let id = tokio_test::block_on(svc.create(vendor, input)).unwrap();
    /// let view = tokio_test::block_on(svc.get(id)).unwrap();
    /// assert_eq!(view.category_type.as_deref(), Some("Tents"));
    /// assert_eq!(view.status, "ACTIVE");
    /// ```
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, vendor_id: Uuid, input: NewListing) -> Result<Uuid, ServiceError> {
        input.validate()?;
        let vendor = self
            .repo
            .find_users(&[vendor_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("vendor"))?;
        if vendor.role != Some(UserRole::Vendor) {
            return Err(ServiceError::invalid("only vendors can create listings"));
        }

        let ct = self.resolve_category_type(&input.category_type, input.details.category()).await?;
        let status = input.status_or_default();
        let now = Utc::now().into();
        let listing = Listing {
            id: Uuid::new_v4(),
            vendor_id,
            category_type_id: Some(ct.id),
            category_type: Some(ct.name),
            title: input.title.trim().to_string(),
            description: input.description,
            booking_type: input.booking_type,
            status,
            is_available: input.is_available,
            images: input.images,
            locations: input.locations,
            next_available_date: input.next_available_date,
            available_until: input.available_until,
            details: input.details,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_listing(&listing).await?;
        info!(listing_id = %listing.id, vendor_id = %vendor_id, category = ?listing.category(), "listing_created");
        Ok(listing.id)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ListingView, ServiceError> {
        let listing = self.repo.find_listing(id).await?.ok_or_else(|| ServiceError::not_found("listing"))?;
        self.assemble(vec![listing])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("listing"))
    }

    /// One page of listings matching `filter`, newest first.
    ///
    /// Bad paging or filter input is rejected before the store is queried.
    #[instrument(skip(self, filter), fields(page = page.page, page_size = page.page_size))]
    pub async fn list(&self, filter: &ListingFilter, page: PageRequest) -> Result<Paginated<ListingView>, ServiceError> {
        let window = page.window()?;
        filter.validate()?;
        let total = self.repo.count_listings(filter).await?;
        let rows = self.repo.find_listings(filter, window).await?;
        debug!(total, returned = rows.len(), "listings fetched");
        let views = self.assemble(rows).await?;
        Ok(Paginated::new(views, total, page))
    }

    /// Apply a partial update; `authorize` decides on the current owner.
    #[instrument(skip(self, patch, authorize))]
    pub async fn update(&self, id: Uuid, patch: ListingPatch, authorize: &dyn Authorize) -> Result<(), ServiceError> {
        patch.validate()?;
        let current = self.repo.find_listing(id).await?.ok_or_else(|| ServiceError::not_found("listing"))?;
        let head = current.head();
        if !authorize.permits(&head) {
            warn!(listing_id = %id, vendor_id = %head.vendor_id, "listing update rejected");
            return Err(ServiceError::Forbidden("not allowed to modify this listing".into()));
        }

        let next_from = patch.next_available_date.unwrap_or(current.next_available_date);
        let next_until = patch.available_until.unwrap_or(current.available_until);
        if let (Some(from), Some(until)) = (next_from, next_until) {
            if from > until {
                return Err(ServiceError::invalid("nextAvailableDate must not be after availableUntil"));
            }
        }

        let category = patch.details.as_ref().map_or(head.category, |d| d.category());
        let category_type_id = match &patch.category_type {
            Some(name) => Some(self.resolve_category_type(name, category).await?.id),
            None if category != head.category => {
                return Err(ServiceError::invalid("changing the category requires a categoryType"));
            }
            None => None,
        };
        if patch.is_empty() {
            debug!(listing_id = %id, "empty patch, nothing to write");
            return Ok(());
        }

        if !self.repo.update_listing(id, Some(head.vendor_id), &patch, category_type_id).await? {
            return Err(ServiceError::not_found("listing"));
        }
        info!(listing_id = %id, "listing_updated");
        Ok(())
    }

    #[instrument(skip(self, authorize))]
    pub async fn delete(&self, id: Uuid, authorize: &dyn Authorize) -> Result<(), ServiceError> {
        let head = self.repo.listing_head(id).await?.ok_or_else(|| ServiceError::not_found("listing"))?;
        if !authorize.permits(&head) {
            warn!(listing_id = %id, vendor_id = %head.vendor_id, "listing delete rejected");
            return Err(ServiceError::Forbidden("not allowed to delete this listing".into()));
        }
        if !self.repo.delete_listing(id, Some(head.vendor_id)).await? {
            return Err(ServiceError::not_found("listing"));
        }
        info!(listing_id = %id, "listing_deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<(), ServiceError> {
        item::validate_status(status)?;
        if !self.repo.set_listing_status(id, status.trim()).await? {
            return Err(ServiceError::not_found("listing"));
        }
        info!(listing_id = %id, status = %status.trim(), "listing_status_changed");
        Ok(())
    }

    /// Record a review; the vendor is taken from the listing.
    #[instrument(skip(self, comment))]
    pub async fn add_review(&self, listing_id: Uuid, reviewer_id: Uuid, rating: i32, comment: &str) -> Result<Uuid, ServiceError> {
        review::validate_rating(rating)?;
        let head = self.repo.listing_head(listing_id).await?.ok_or_else(|| ServiceError::not_found("listing"))?;
        if self.repo.find_users(&[reviewer_id]).await?.is_empty() {
            return Err(ServiceError::not_found("reviewer"));
        }
        if reviewer_id == head.vendor_id {
            return Err(ServiceError::invalid("vendors cannot review their own listings"));
        }
        let id = self
            .repo
            .insert_review(NewReview {
                item_id: listing_id,
                vendor_id: head.vendor_id,
                reviewer_id,
                rating,
                comment: comment.trim().to_string(),
            })
            .await?;
        info!(review_id = %id, listing_id = %listing_id, rating, "review_added");
        Ok(id)
    }

    pub async fn rating_of(&self, listing_id: Uuid) -> Result<RatingSummary, ServiceError> {
        if self.repo.listing_head(listing_id).await?.is_none() {
            return Err(ServiceError::not_found("listing"));
        }
        let ratings = self.repo.ratings_for(&[listing_id]).await?;
        Ok(rating::summarize(ratings.get(&listing_id).map(Vec::as_slice).unwrap_or_default()))
    }

    /// Attach ratings and vendors with one query each for the whole batch.
    async fn assemble(&self, listings: Vec<Listing>) -> Result<Vec<ListingView>, ServiceError> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = listings.iter().map(|l| l.id).collect();
        let ratings = self.repo.ratings_for(&ids).await?;

        let mut vendor_ids: Vec<Uuid> = listings.iter().map(|l| l.vendor_id).collect();
        vendor_ids.sort_unstable();
        vendor_ids.dedup();
        let vendors: HashMap<Uuid, VendorSummary> =
            self.repo.find_users(&vendor_ids).await?.into_iter().map(|v| (v.id, v)).collect();

        Ok(listings
            .into_iter()
            .map(|l| {
                let summary = rating::summarize(ratings.get(&l.id).map(Vec::as_slice).unwrap_or_default());
                let vendor = vendors.get(&l.vendor_id).cloned();
                ListingView::assemble(l, summary, vendor)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{
        any_listing, owned_by, BookingType, DateRange, ListingDetails, ListingHead, PackageDetails, RentalDetails, ServiceDetails,
        Timestamp,
    };
    use crate::catalog::repository::mock::{MemoryCatalogRepository, WriteRace};
    use chrono::{Duration, TimeZone};

    fn rental(title: &str, category_type: &str) -> NewListing {
        NewListing {
            title: title.into(),
            description: "test listing".into(),
            category_type: category_type.into(),
            booking_type: BookingType::Instant,
            status: None,
            is_available: true,
            images: vec![],
            locations: vec!["Victoria Island, Lagos".into()],
            next_available_date: None,
            available_until: None,
            details: ListingDetails::Rental(RentalDetails { price: 30.0, pricing_unit: Some("day".into()), quantity: 1, terms: vec![] }),
        }
    }

    async fn total(svc: &CatalogService<MemoryCatalogRepository>, filter: ListingFilter) -> u64 {
        svc.list(&filter, PageRequest::default()).await.unwrap().meta.total
    }

    async fn setup() -> (Arc<MemoryCatalogRepository>, CatalogService<MemoryCatalogRepository>, Uuid) {
        let repo = Arc::new(MemoryCatalogRepository::new());
        let vendor = repo.add_user("Vendor One", UserRole::Vendor).await;
        (repo.clone(), CatalogService::new(repo), vendor)
    }

    #[tokio::test]
    async fn invalid_page_is_rejected_without_store_query() {
        let (repo, svc, _) = setup().await;
        for (page, size) in [(0, 10), (-1, 10), (1, 0), (1, 31), (i64::MAX, 30)] {
            let err = svc.list(&ListingFilter::default(), PageRequest::new(page, size)).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "page={page} size={size}");
        }
        assert_eq!(repo.query_count(), 0);
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected() {
        let (repo, svc, _) = setup().await;
        let day: Timestamp = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap().into();
        let filter = ListingFilter { available: Some(DateRange { from: day, to: day - Duration::days(1) }), ..Default::default() };
        let err = svc.list(&filter, PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(repo.query_count(), 0);
    }

    #[tokio::test]
    async fn total_pages_use_full_count() {
        let (_, svc, vendor) = setup().await;
        for i in 0..45 {
            svc.create(vendor, rental(&format!("Tent {i}"), "Tents")).await.unwrap();
        }
        let page = svc.list(&ListingFilter::default(), PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.data.len(), 10);
        assert_eq!(page.meta.total, 45);
        assert_eq!(page.meta.total_pages, 5);

        let last = svc.list(&ListingFilter::default(), PageRequest::new(5, 10)).await.unwrap();
        assert_eq!(last.data.len(), 5);
        let beyond = svc.list(&ListingFilter::default(), PageRequest::new(6, 10)).await.unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.meta.total, 45);
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let (_, svc, vendor) = setup().await;
        let first = svc.create(vendor, rental("First", "Tents")).await.unwrap();
        let second = svc.create(vendor, rental("Second", "Tents")).await.unwrap();
        let page = svc.list(&ListingFilter::default(), PageRequest::default()).await.unwrap();
        let ids: Vec<Uuid> = page.data.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn same_category_type_is_reused() {
        let (repo, svc, vendor) = setup().await;
        let a = svc.create(vendor, rental("Tent A", "Tents")).await.unwrap();
        let b = svc.create(vendor, rental("Tent B", " Tents ")).await.unwrap();
        assert_eq!(repo.category_type_count().await, 1);
        let (a, b) = (svc.get(a).await.unwrap(), svc.get(b).await.unwrap());
        assert_eq!(a.category_type, b.category_type);
    }

    #[tokio::test]
    async fn resolve_recovers_from_lost_insert_race() {
        let (repo, svc, _) = setup().await;
        let existing = svc.resolve_category_type("Drones", Category::Rentals).await.unwrap();
        // the lookup misses, the insert conflicts, the refetch wins
        repo.miss_next_lookups(1);
        let again = svc.resolve_category_type("Drones", Category::Rentals).await.unwrap();
        assert_eq!(again.id, existing.id);
        assert_eq!(repo.category_type_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_row() {
        let (repo, svc, _) = setup().await;
        let svc = Arc::new(svc);
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.resolve_category_type("Canopies", Category::Rentals).await })
            })
            .collect();
        let mut ids = Vec::new();
        for t in tasks {
            ids.push(t.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(repo.category_type_count().await, 1);
    }

    #[tokio::test]
    async fn existing_type_keeps_its_category() {
        let (_, svc, _) = setup().await;
        let ct = svc.resolve_category_type("Sound", Category::Rentals).await.unwrap();
        let again = svc.resolve_category_type("Sound", Category::Services).await.unwrap();
        assert_eq!(again.id, ct.id);
        assert_eq!(again.category, Category::Rentals);
        assert!(matches!(svc.resolve_category_type("   ", Category::Rentals).await, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn ratings_are_aggregated_per_listing() {
        let (repo, svc, vendor) = setup().await;
        let buyer = repo.add_user("Buyer", UserRole::Buyer).await;
        let a = svc.create(vendor, rental("A", "Tents")).await.unwrap();
        let b = svc.create(vendor, rental("B", "Tents")).await.unwrap();
        let c = svc.create(vendor, rental("C", "Tents")).await.unwrap();
        for r in [5, 4] { svc.add_review(a, buyer, r, "").await.unwrap(); }
        for r in [3, 3, 4] { svc.add_review(c, buyer, r, "fine").await.unwrap(); }

        let page = svc.list(&ListingFilter::default(), PageRequest::default()).await.unwrap();
        let by_id: HashMap<Uuid, &ListingView> = page.data.iter().map(|v| (v.id, v)).collect();
        assert_eq!((by_id[&a].average_rating, by_id[&a].review_count), (4.5, 2));
        assert_eq!((by_id[&b].average_rating, by_id[&b].review_count), (0.0, 0));
        assert_eq!((by_id[&c].average_rating, by_id[&c].review_count), (3.3, 3));
        assert_eq!(svc.rating_of(c).await.unwrap().review_count, 3);
        assert_eq!(by_id[&a].vendor.as_ref().map(|v| v.id), Some(vendor));
    }

    #[tokio::test]
    async fn review_rating_out_of_range_is_rejected() {
        let (repo, svc, vendor) = setup().await;
        let buyer = repo.add_user("Buyer", UserRole::Buyer).await;
        let id = svc.create(vendor, rental("A", "Tents")).await.unwrap();
        for bad in [0, 6, -3] {
            assert!(matches!(svc.add_review(id, buyer, bad, "").await, Err(ServiceError::InvalidArgument(_))));
        }
        assert!(matches!(svc.add_review(id, vendor, 5, "").await, Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(svc.add_review(id, Uuid::new_v4(), 5, "").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.add_review(Uuid::new_v4(), buyer, 5, "").await, Err(ServiceError::NotFound(_))));
        assert_eq!(svc.rating_of(id).await.unwrap(), RatingSummary { average_rating: 0.0, review_count: 0 });
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_, svc, vendor) = setup().await;
        assert!(matches!(svc.delete(Uuid::new_v4(), &any_listing).await, Err(ServiceError::NotFound(_))));
        let id = svc.create(vendor, rental("A", "Tents")).await.unwrap();
        svc.delete(id, &owned_by(vendor)).await.unwrap();
        assert!(matches!(svc.get(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(id, &owned_by(vendor)).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn forbidden_update_leaves_listing_unchanged() {
        let (_, svc, vendor) = setup().await;
        let id = svc.create(vendor, rental("Original", "Tents")).await.unwrap();
        let patch = ListingPatch { title: Some("Hijacked".into()), ..Default::default() };
        let err = svc.update(id, patch, &owned_by(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(err.status(), 403);
        assert_eq!(svc.get(id).await.unwrap().title, "Original");
        assert!(matches!(svc.delete(id, &|_: &ListingHead| false).await, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn category_change_needs_new_type() {
        let (_, svc, vendor) = setup().await;
        let id = svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        let service = ListingDetails::Service(ServiceDetails {
            min_price: 80.0,
            pricing_unit: Some("event".into()),
            experience: Some("8 years".into()),
            career_highlight: None,
            education: None,
            offers: vec!["Setup included".into()],
        });
        let patch = ListingPatch { details: Some(service.clone()), ..Default::default() };
        assert!(matches!(svc.update(id, patch, &owned_by(vendor)).await, Err(ServiceError::InvalidArgument(_))));

        let patch = ListingPatch { details: Some(service), category_type: Some("Event setup".into()), ..Default::default() };
        svc.update(id, patch, &owned_by(vendor)).await.unwrap();
        let view = svc.get(id).await.unwrap();
        assert_eq!(view.category, Category::Services);
        assert_eq!(view.category_type.as_deref(), Some("Event setup"));
        assert_eq!(view.price, None);
        assert_eq!(view.min_price, Some(80.0));
        assert_eq!(view.quantity, None);
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let (_, svc, vendor) = setup().await;
        let id = svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        let patch = ListingPatch { title: Some("Big tent".into()), is_available: Some(false), ..Default::default() };
        svc.update(id, patch, &owned_by(vendor)).await.unwrap();
        let view = svc.get(id).await.unwrap();
        assert_eq!(view.title, "Big tent");
        assert!(!view.is_available);
        assert_eq!(view.price, Some(30.0));
        assert!(matches!(svc.update(Uuid::new_v4(), ListingPatch::default(), &any_listing).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_rejects_inverted_window_against_stored_dates() {
        let (_, svc, vendor) = setup().await;
        let until: Timestamp = Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap().into();
        let mut input = rental("Tent", "Tents");
        input.available_until = Some(until);
        let id = svc.create(vendor, input).await.unwrap();
        let patch = ListingPatch { next_available_date: Some(Some(until + Duration::days(1))), ..Default::default() };
        assert!(matches!(svc.update(id, patch, &any_listing).await, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn update_losing_to_concurrent_delete_is_not_found() {
        let (repo, svc, vendor) = setup().await;
        let id = svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        repo.race_next_write(id, WriteRace::Delete).await;
        let patch = ListingPatch { title: Some("Renamed".into()), ..Default::default() };
        let err = svc.update(id, patch, &owned_by(vendor)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(matches!(svc.get(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_after_ownership_change_writes_nothing() {
        let (repo, svc, vendor) = setup().await;
        let new_owner = repo.add_user("Vendor Two", UserRole::Vendor).await;
        let id = svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        repo.race_next_write(id, WriteRace::Reassign(new_owner)).await;
        let patch = ListingPatch { title: Some("Renamed".into()), ..Default::default() };
        let err = svc.update(id, patch, &owned_by(vendor)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let view = svc.get(id).await.unwrap();
        assert_eq!(view.title, "Tent");
        assert_eq!(view.vendor.map(|v| v.id), Some(new_owner));
    }

    #[tokio::test]
    async fn delete_losing_to_concurrent_change_is_not_found() {
        let (repo, svc, vendor) = setup().await;
        let new_owner = repo.add_user("Vendor Two", UserRole::Vendor).await;
        let kept = svc.create(vendor, rental("Kept", "Tents")).await.unwrap();
        repo.race_next_write(kept, WriteRace::Reassign(new_owner)).await;
        assert!(matches!(svc.delete(kept, &owned_by(vendor)).await, Err(ServiceError::NotFound(_))));
        assert_eq!(svc.get(kept).await.unwrap().title, "Kept");

        let gone = svc.create(vendor, rental("Gone", "Tents")).await.unwrap();
        repo.race_next_write(gone, WriteRace::Delete).await;
        assert!(matches!(svc.delete(gone, &owned_by(vendor)).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.set_status(kept, "PAUSED").await, Ok(())));

        repo.race_next_write(kept, WriteRace::Delete).await;
        assert!(matches!(svc.set_status(kept, "ACTIVE").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_clears_availability_date() {
        let (_, svc, vendor) = setup().await;
        let mut input = rental("Tent", "Tents");
        input.next_available_date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap().into());
        let id = svc.create(vendor, input).await.unwrap();
        let patch: ListingPatch = serde_json::from_value(serde_json::json!({"nextAvailableDate": null})).unwrap();
        svc.update(id, patch, &owned_by(vendor)).await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().next_available_date, None);
    }

    #[tokio::test]
    async fn set_status_conditional_write() {
        let (_, svc, vendor) = setup().await;
        let id = svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        svc.set_status(id, "PAUSED").await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().status, "PAUSED");
        assert!(matches!(svc.set_status(Uuid::new_v4(), "PAUSED").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.set_status(id, " ").await, Err(ServiceError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn create_requires_vendor_role() {
        let (repo, svc, _) = setup().await;
        let buyer = repo.add_user("Buyer", UserRole::Buyer).await;
        assert!(matches!(svc.create(buyer, rental("A", "Tents")).await, Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(svc.create(Uuid::new_v4(), rental("A", "Tents")).await, Err(ServiceError::NotFound(_))));
        assert_eq!(repo.category_type_count().await, 0);
    }

    #[tokio::test]
    async fn filters_narrow_the_page() {
        let (repo, svc, vendor) = setup().await;
        let other = repo.add_user("Vendor Two", UserRole::Vendor).await;
        svc.create(vendor, rental("Tent", "Tents")).await.unwrap();
        let mut abuja = rental("Chairs", "Chairs");
        abuja.locations = vec!["Wuse, ABUJA".into()];
        svc.create(other, abuja).await.unwrap();
        let mut package = rental("Wedding bundle", "Weddings");
        package.details = ListingDetails::Package(PackageDetails {
            min_price: Some(500.0),
            prices: vec!["Basic: 500".into(), "Full: 1200".into()],
            offers: vec![],
            terms: vec![],
        });
        svc.create(vendor, package).await.unwrap();

        assert_eq!(total(&svc, ListingFilter { category: Some(Category::Packages), ..Default::default() }).await, 1);
        assert_eq!(total(&svc, ListingFilter { category_type: Some("Chairs".into()), ..Default::default() }).await, 1);
        assert_eq!(total(&svc, ListingFilter { location: Some("abuja".into()), ..Default::default() }).await, 1);
        assert_eq!(total(&svc, ListingFilter { vendor_id: Some(vendor), ..Default::default() }).await, 2);

        let types = svc.category_types(Some(Category::Rentals)).await.unwrap();
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Chairs", "Tents"]);
    }
}
