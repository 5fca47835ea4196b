//! Catalog domain types.
//!
//! Listings share one flat row in the store, but the service works with a
//! tagged [`ListingDetails`] so a rental can never carry service-only fields
//! and vice versa.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use models::item;
pub use models::types::{BookingType, Category, UserRole};

use super::rating::RatingSummary;
use crate::errors::ServiceError;

pub type Timestamp = DateTime<FixedOffset>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalDetails {
    pub price: f64,
    #[serde(default)]
    pub pricing_unit: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub terms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    pub min_price: f64,
    #[serde(default)]
    pub pricing_unit: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub career_highlight: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub offers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub prices: Vec<String>,
    #[serde(default)]
    pub offers: Vec<String>,
    #[serde(default)]
    pub terms: Vec<String>,
}

/// Category-specific part of a listing. The variant is the category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum ListingDetails {
    #[serde(rename = "RENTALS")]
    Rental(RentalDetails),
    #[serde(rename = "SERVICES")]
    Service(ServiceDetails),
    #[serde(rename = "PACKAGES")]
    Package(PackageDetails),
}

/// Flat projection of [`ListingDetails`] onto the row's nullable columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailColumns {
    pub price: Option<f64>,
    pub min_price: Option<f64>,
    pub pricing_unit: Option<String>,
    pub quantity: Option<i32>,
    pub experience: Option<String>,
    pub career_highlight: Option<String>,
    pub education: Option<String>,
    pub terms: Vec<String>,
    pub offers: Vec<String>,
    pub prices: Vec<String>,
}

impl ListingDetails {
    pub fn category(&self) -> Category {
        match self {
            ListingDetails::Rental(_) => Category::Rentals,
            ListingDetails::Service(_) => Category::Services,
            ListingDetails::Package(_) => Category::Packages,
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        match self {
            ListingDetails::Rental(r) => {
                item::validate_amount("price", r.price)?;
                if r.quantity < 0 {
                    return Err(ServiceError::invalid("quantity must be >= 0"));
                }
                if let Some(unit) = &r.pricing_unit { item::validate_pricing_unit(unit)?; }
            }
            ListingDetails::Service(s) => {
                item::validate_amount("minPrice", s.min_price)?;
                if let Some(unit) = &s.pricing_unit { item::validate_pricing_unit(unit)?; }
            }
            ListingDetails::Package(p) => {
                if let Some(min) = p.min_price { item::validate_amount("minPrice", min)?; }
                if p.prices.is_empty() {
                    return Err(ServiceError::invalid("a package needs at least one price"));
                }
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> DetailColumns {
        match self {
            ListingDetails::Rental(r) => DetailColumns {
                price: Some(r.price),
                pricing_unit: r.pricing_unit.clone(),
                quantity: Some(r.quantity),
                terms: r.terms.clone(),
                ..DetailColumns::default()
            },
            ListingDetails::Service(s) => DetailColumns {
                min_price: Some(s.min_price),
                pricing_unit: s.pricing_unit.clone(),
                experience: s.experience.clone(),
                career_highlight: s.career_highlight.clone(),
                education: s.education.clone(),
                offers: s.offers.clone(),
                ..DetailColumns::default()
            },
            ListingDetails::Package(p) => DetailColumns {
                min_price: p.min_price,
                prices: p.prices.clone(),
                offers: p.offers.clone(),
                terms: p.terms.clone(),
                ..DetailColumns::default()
            },
        }
    }

    /// Rebuild from a flat row; columns foreign to `category` are ignored.
    pub fn from_columns(category: Category, c: DetailColumns) -> Self {
        match category {
            Category::Rentals => ListingDetails::Rental(RentalDetails {
                price: c.price.unwrap_or_default(),
                pricing_unit: c.pricing_unit,
                quantity: c.quantity.unwrap_or_default(),
                terms: c.terms,
            }),
            Category::Services => ListingDetails::Service(ServiceDetails {
                min_price: c.min_price.unwrap_or_default(),
                pricing_unit: c.pricing_unit,
                experience: c.experience,
                career_highlight: c.career_highlight,
                education: c.education,
                offers: c.offers,
            }),
            Category::Packages => ListingDetails::Package(PackageDetails {
                min_price: c.min_price,
                prices: c.prices,
                offers: c.offers,
                terms: c.terms,
            }),
        }
    }
}

/// Input for creating a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Name of the category type; created on first use.
    pub category_type: String,
    pub booking_type: BookingType,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub next_available_date: Option<Timestamp>,
    #[serde(default)]
    pub available_until: Option<Timestamp>,
    pub details: ListingDetails,
}

fn default_available() -> bool { true }

impl NewListing {
    pub fn validate(&self) -> Result<(), ServiceError> {
        item::validate_title(&self.title)?;
        if let Some(status) = &self.status { item::validate_status(status)?; }
        validate_window(self.next_available_date, self.available_until)?;
        self.details.validate()
    }

    pub fn status_or_default(&self) -> String {
        self.status.as_deref().map(str::trim).unwrap_or(item::DEFAULT_STATUS).to_string()
    }
}

fn validate_window(from: Option<Timestamp>, until: Option<Timestamp>) -> Result<(), ServiceError> {
    if let (Some(from), Some(until)) = (from, until) {
        if from > until {
            return Err(ServiceError::invalid("nextAvailableDate must not be after availableUntil"));
        }
    }
    Ok(())
}

/// Partial update of a listing; `None` leaves a field untouched.
/// Nested options clear nullable fields with `Some(None)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_type: Option<String>,
    #[serde(default)]
    pub booking_type: Option<BookingType>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub locations: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub next_available_date: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub available_until: Option<Option<Timestamp>>,
    #[serde(default)]
    pub details: Option<ListingDetails>,
}

/// A key that is present is `Some`, even when its value is `null`;
/// absent keys fall back to `None` through `#[serde(default)]`.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool { *self == ListingPatch::default() }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(title) = &self.title { item::validate_title(title)?; }
        if let Some(details) = &self.details { details.validate()?; }
        if let (Some(from), Some(until)) = (self.next_available_date, self.available_until) {
            validate_window(from, until)?;
        }
        Ok(())
    }
}

/// A stored listing as the service sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub category_type_id: Option<Uuid>,
    pub category_type: Option<String>,
    pub title: String,
    pub description: String,
    pub booking_type: BookingType,
    pub status: String,
    pub is_available: bool,
    pub images: Vec<String>,
    pub locations: Vec<String>,
    pub next_available_date: Option<Timestamp>,
    pub available_until: Option<Timestamp>,
    pub details: ListingDetails,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Listing {
    pub fn category(&self) -> Category { self.details.category() }

    pub fn head(&self) -> ListingHead {
        ListingHead { id: self.id, vendor_id: self.vendor_id, category: self.category() }
    }

    pub fn from_row(row: item::Model, category_type: Option<String>) -> Self {
        let details = ListingDetails::from_columns(
            row.category,
            DetailColumns {
                price: row.price,
                min_price: row.min_price,
                pricing_unit: row.pricing_unit,
                quantity: row.quantity,
                experience: row.experience,
                career_highlight: row.career_highlight,
                education: row.education,
                terms: row.terms.into(),
                offers: row.offers.into(),
                prices: row.prices.into(),
            },
        );
        Self {
            id: row.id,
            vendor_id: row.vendor_id,
            category_type_id: row.category_type_id,
            category_type,
            title: row.title,
            description: row.description,
            booking_type: row.booking_type,
            status: row.status,
            is_available: row.is_available,
            images: row.images.into(),
            locations: row.locations.into(),
            next_available_date: row.next_available_date,
            available_until: row.available_until,
            details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// The part of a listing ownership checks look at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListingHead {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub category: Category,
}

/// Injected authorization check for mutating a listing.
pub trait Authorize: Send + Sync {
    fn permits(&self, listing: &ListingHead) -> bool;
}

impl<F> Authorize for F
where
    F: Fn(&ListingHead) -> bool + Send + Sync,
{
    fn permits(&self, listing: &ListingHead) -> bool { self(listing) }
}

/// Only the owning vendor may touch the listing.
pub fn owned_by(vendor_id: Uuid) -> impl Fn(&ListingHead) -> bool + Send + Sync {
    move |listing| listing.vendor_id == vendor_id
}

/// No ownership restriction (admin paths).
pub fn any_listing(_: &ListingHead) -> bool { true }

/// Closed date range used to filter by availability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    #[serde(default)]
    pub category: Option<Category>,
    /// Exact category-type name.
    #[serde(default)]
    pub category_type: Option<String>,
    /// Availability window overlapping this range, and `is_available`.
    #[serde(default)]
    pub available: Option<DateRange>,
    /// Case-insensitive substring of any location.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<Uuid>,
}

impl ListingFilter {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(range) = &self.available {
            if range.from > range.to {
                return Err(ServiceError::invalid("date range start must not be after its end"));
            }
        }
        if matches!(&self.location, Some(l) if l.trim().is_empty()) {
            return Err(ServiceError::invalid("location filter must not be blank"));
        }
        if matches!(&self.category_type, Some(c) if c.trim().is_empty()) {
            return Err(ServiceError::invalid("categoryType filter must not be blank"));
        }
        Ok(())
    }

    /// In-process evaluation with the same semantics as the SQL filter.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(category) = self.category {
            if listing.category() != category { return false; }
        }
        if let Some(vendor) = self.vendor_id {
            if listing.vendor_id != vendor { return false; }
        }
        if let Some(name) = &self.category_type {
            if listing.category_type.as_deref() != Some(name.trim()) { return false; }
        }
        if let Some(range) = &self.available {
            if !listing.is_available { return false; }
            if matches!(listing.next_available_date, Some(start) if start > range.to) { return false; }
            if matches!(listing.available_until, Some(end) if end < range.from) { return false; }
        }
        if let Some(needle) = &self.location {
            let needle = needle.trim().to_lowercase();
            if !listing.locations.iter().any(|l| l.to_lowercase().contains(&needle)) { return false; }
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryType {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
}

impl From<models::category_type::Model> for CategoryType {
    fn from(m: models::category_type::Model) -> Self {
        Self { id: m.id, name: m.name, category: m.category }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub role: Option<UserRole>,
}

impl From<models::user::Model> for VendorSummary {
    fn from(u: models::user::Model) -> Self {
        Self { id: u.id, name: u.name, email: u.email, role: Some(u.role) }
    }
}

/// Listing as returned to the response layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: String,
    pub images: Vec<String>,
    pub price: Option<f64>,
    pub booking_type: BookingType,
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_type: Option<String>,
    pub terms: Vec<String>,
    pub locations: Vec<String>,
    pub is_available: bool,
    pub pricing_unit: Option<String>,
    pub min_price: Option<f64>,
    pub experience: Option<String>,
    pub career_highlight: Option<String>,
    pub education: Option<String>,
    pub offers: Vec<String>,
    pub prices: Vec<String>,
    pub next_available_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub average_rating: f64,
    pub review_count: u64,
    pub vendor: Option<VendorSummary>,
}

impl ListingView {
    pub fn assemble(listing: Listing, rating: RatingSummary, vendor: Option<VendorSummary>) -> Self {
        let category = listing.category();
        let c = listing.details.columns();
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            category,
            status: listing.status,
            images: listing.images,
            price: c.price,
            booking_type: listing.booking_type,
            quantity: c.quantity,
            category_type: listing.category_type,
            terms: c.terms,
            locations: listing.locations,
            is_available: listing.is_available,
            pricing_unit: c.pricing_unit,
            min_price: c.min_price,
            experience: c.experience,
            career_highlight: c.career_highlight,
            education: c.education,
            offers: c.offers,
            prices: c.prices,
            next_available_date: listing.next_available_date,
            created_at: listing.created_at,
            average_rating: rating.average_rating,
            review_count: rating.review_count,
            vendor,
        }
    }
}
