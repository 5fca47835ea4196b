use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Category, CategoryType, Listing, ListingFilter, ListingHead, ListingPatch, VendorSummary};
use crate::errors::StoreError;
use crate::pagination::Window;

/// Review as written by the service; the store assigns id and timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReview {
    pub item_id: Uuid,
    pub vendor_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

/// Persistence seam of the catalog.
///
/// Writes that target an existing listing are conditional: they report
/// whether a row matched instead of failing, so callers can map a lost race
/// to `NotFound`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_category_type(&self, name: &str) -> Result<Option<CategoryType>, StoreError>;
    /// Fails with `UniqueViolation` when the name exists, unless the store
    /// resolves the conflict itself and returns the surviving row.
    async fn insert_category_type(&self, name: &str, category: Category) -> Result<CategoryType, StoreError>;
    async fn list_category_types(&self, category: Option<Category>) -> Result<Vec<CategoryType>, StoreError>;

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<VendorSummary>, StoreError>;

    async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
    async fn listing_head(&self, id: Uuid) -> Result<Option<ListingHead>, StoreError>;
    async fn count_listings(&self, filter: &ListingFilter) -> Result<u64, StoreError>;
    /// Ordered by `created_at DESC, id DESC`.
    async fn find_listings(&self, filter: &ListingFilter, window: Window) -> Result<Vec<Listing>, StoreError>;
    async fn update_listing(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        patch: &ListingPatch,
        category_type_id: Option<Uuid>,
    ) -> Result<bool, StoreError>;
    async fn set_listing_status(&self, id: Uuid, status: &str) -> Result<bool, StoreError>;
    async fn delete_listing(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, StoreError>;

    /// Ratings grouped by listing; listings without reviews are absent.
    async fn ratings_for(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<i32>>, StoreError>;
    async fn insert_review(&self, review: NewReview) -> Result<Uuid, StoreError>;
}

/// In-memory store for tests, benches and doc examples.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, Utc};
    use tokio::sync::Mutex;

    use crate::catalog::domain::{ListingDetails, Timestamp, UserRole};

    #[derive(Default)]
    struct State {
        users: HashMap<Uuid, VendorSummary>,
        category_types: HashMap<String, CategoryType>, // key: name
        listings: HashMap<Uuid, Listing>,
        reviews: Vec<NewReview>,
        ticks: i64,
        race: Option<(Uuid, WriteRace)>,
    }

    /// What another writer does to a listing just before the next write.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum WriteRace {
        Delete,
        Reassign(Uuid),
    }

    fn remove_listing(state: &mut State, id: Uuid) {
        state.listings.remove(&id);
        // reviews cascade with their listing
        state.reviews.retain(|r| r.item_id != id);
    }

    fn run_race(state: &mut State) {
        match state.race.take() {
            Some((id, WriteRace::Delete)) => remove_listing(state, id),
            Some((id, WriteRace::Reassign(vendor_id))) => {
                if let Some(listing) = state.listings.get_mut(&id) { listing.vendor_id = vendor_id; }
            }
            None => {}
        }
    }

    pub struct MemoryCatalogRepository {
        state: Mutex<State>,
        epoch: Timestamp,
        queries: AtomicUsize,
        stale_lookups: AtomicUsize,
    }

    impl Default for MemoryCatalogRepository {
        fn default() -> Self {
            Self {
                state: Mutex::new(State::default()),
                epoch: Utc::now().into(),
                queries: AtomicUsize::new(0),
                stale_lookups: AtomicUsize::new(0),
            }
        }
    }

    impl MemoryCatalogRepository {
        pub fn new() -> Self { Self::default() }

        /// Register a user; returns its id.
        pub async fn add_user(&self, name: &str, role: UserRole) -> Uuid {
            let id = Uuid::new_v4();
            let user = VendorSummary {
                id,
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                role: Some(role),
            };
            self.state.lock().await.users.insert(id, user);
            id
        }

        /// Store operations issued so far.
        pub fn query_count(&self) -> usize { self.queries.load(Ordering::SeqCst) }

        /// Make the next `n` category-type lookups miss, as if another
        /// writer inserted the row right after the lookup.
        pub fn miss_next_lookups(&self, n: usize) { self.stale_lookups.store(n, Ordering::SeqCst); }

        /// Let another writer change listing `id` after the service has read
        /// it but before its conditional write lands.
        pub async fn race_next_write(&self, id: Uuid, race: WriteRace) {
            self.state.lock().await.race = Some((id, race));
        }

        pub async fn category_type_count(&self) -> usize { self.state.lock().await.category_types.len() }

        fn hit(&self) { self.queries.fetch_add(1, Ordering::SeqCst); }

        // strictly increasing so ordering by created_at is deterministic
        fn now(&self, state: &mut State) -> Timestamp {
            state.ticks += 1;
            self.epoch + Duration::milliseconds(state.ticks)
        }
    }

    fn apply(listing: &mut Listing, patch: &ListingPatch, category_type: Option<&CategoryType>) {
        if let Some(title) = &patch.title { listing.title = title.trim().to_string(); }
        if let Some(description) = &patch.description { listing.description = description.clone(); }
        if let Some(booking_type) = patch.booking_type { listing.booking_type = booking_type; }
        if let Some(is_available) = patch.is_available { listing.is_available = is_available; }
        if let Some(images) = &patch.images { listing.images = images.clone(); }
        if let Some(locations) = &patch.locations { listing.locations = locations.clone(); }
        if let Some(date) = patch.next_available_date { listing.next_available_date = date; }
        if let Some(date) = patch.available_until { listing.available_until = date; }
        if let Some(details) = &patch.details {
            listing.details = ListingDetails::from_columns(details.category(), details.columns());
        }
        if let Some(ct) = category_type {
            listing.category_type_id = Some(ct.id);
            listing.category_type = Some(ct.name.clone());
        }
    }

    #[async_trait]
    impl CatalogRepository for MemoryCatalogRepository {
        async fn find_category_type(&self, name: &str) -> Result<Option<CategoryType>, StoreError> {
            self.hit();
            let stale = self
                .stale_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if stale { return Ok(None); }
            Ok(self.state.lock().await.category_types.get(name).cloned())
        }

        async fn insert_category_type(&self, name: &str, category: Category) -> Result<CategoryType, StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            if state.category_types.contains_key(name) {
                return Err(StoreError::UniqueViolation(format!("category_type.name = {name}")));
            }
            let ct = CategoryType { id: Uuid::new_v4(), name: name.to_string(), category };
            state.category_types.insert(name.to_string(), ct.clone());
            Ok(ct)
        }

        async fn list_category_types(&self, category: Option<Category>) -> Result<Vec<CategoryType>, StoreError> {
            self.hit();
            let state = self.state.lock().await;
            let mut out: Vec<CategoryType> = state
                .category_types
                .values()
                .filter(|ct| category.map_or(true, |c| ct.category == c))
                .cloned()
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        }

        async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<VendorSummary>, StoreError> {
            self.hit();
            let state = self.state.lock().await;
            Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
        }

        async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            if state.listings.contains_key(&listing.id) {
                return Err(StoreError::UniqueViolation(format!("item.id = {}", listing.id)));
            }
            if !state.users.contains_key(&listing.vendor_id) {
                return Err(StoreError::Backend("item.vendor_id references a missing user".into()));
            }
            let mut stored = listing.clone();
            let now = self.now(&mut state);
            stored.created_at = now;
            stored.updated_at = now;
            state.listings.insert(stored.id, stored);
            Ok(())
        }

        async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
            self.hit();
            Ok(self.state.lock().await.listings.get(&id).cloned())
        }

        async fn listing_head(&self, id: Uuid) -> Result<Option<ListingHead>, StoreError> {
            self.hit();
            Ok(self.state.lock().await.listings.get(&id).map(Listing::head))
        }

        async fn count_listings(&self, filter: &ListingFilter) -> Result<u64, StoreError> {
            self.hit();
            let state = self.state.lock().await;
            Ok(state.listings.values().filter(|l| filter.matches(l)).count() as u64)
        }

        async fn find_listings(&self, filter: &ListingFilter, window: Window) -> Result<Vec<Listing>, StoreError> {
            self.hit();
            let state = self.state.lock().await;
            let mut rows: Vec<&Listing> = state.listings.values().filter(|l| filter.matches(l)).collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
            Ok(rows
                .into_iter()
                .skip(window.skip as usize)
                .take(window.take as usize)
                .cloned()
                .collect())
        }

        async fn update_listing(
            &self,
            id: Uuid,
            owner: Option<Uuid>,
            patch: &ListingPatch,
            category_type_id: Option<Uuid>,
        ) -> Result<bool, StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            run_race(&mut state);
            let category_type = match category_type_id {
                Some(ct_id) => Some(
                    state
                        .category_types
                        .values()
                        .find(|ct| ct.id == ct_id)
                        .cloned()
                        .ok_or_else(|| StoreError::Backend("item.category_type_id references a missing row".into()))?,
                ),
                None => None,
            };
            let now = self.now(&mut state);
            match state.listings.get_mut(&id) {
                Some(listing) if owner.map_or(true, |o| listing.vendor_id == o) => {
                    apply(listing, patch, category_type.as_ref());
                    listing.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn set_listing_status(&self, id: Uuid, status: &str) -> Result<bool, StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            run_race(&mut state);
            let now = self.now(&mut state);
            match state.listings.get_mut(&id) {
                Some(listing) => {
                    listing.status = status.to_string();
                    listing.updated_at = now;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete_listing(&self, id: Uuid, owner: Option<Uuid>) -> Result<bool, StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            run_race(&mut state);
            let owned = state
                .listings
                .get(&id)
                .is_some_and(|l| owner.map_or(true, |o| l.vendor_id == o));
            if !owned { return Ok(false); }
            remove_listing(&mut state, id);
            Ok(true)
        }

        async fn ratings_for(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<i32>>, StoreError> {
            self.hit();
            let state = self.state.lock().await;
            let mut out: HashMap<Uuid, Vec<i32>> = HashMap::new();
            for r in state.reviews.iter().filter(|r| item_ids.contains(&r.item_id)) {
                out.entry(r.item_id).or_default().push(r.rating);
            }
            Ok(out)
        }

        async fn insert_review(&self, review: NewReview) -> Result<Uuid, StoreError> {
            self.hit();
            let mut state = self.state.lock().await;
            if !state.listings.contains_key(&review.item_id) {
                return Err(StoreError::Backend("review.item_id references a missing item".into()));
            }
            state.reviews.push(review);
            Ok(Uuid::new_v4())
        }
    }
}
