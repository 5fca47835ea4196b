//! Pagination policy for service layer
//!
//! Validates 1-based page requests, turns them into `skip`/`take` windows and
//! builds the `{data, meta}` envelope. `total` always comes from a separate
//! count over the same filter, never from the length of the returned page.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 30;

/// Pagination parameters as received from the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page index
    pub page: i64,
    /// items per page, `1..=MAX_PAGE_SIZE`
    pub page_size: i64,
}

/// Row window handed to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self { Self { page, page_size } }

    /// Reject out-of-range input and compute the offset.
    pub fn window(self) -> Result<Window, ServiceError> {
        if self.page < 1 {
            return Err(ServiceError::invalid(format!("page must be >= 1, got {}", self.page)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ServiceError::invalid(format!(
                "pageSize must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        // the store binds OFFSET as a signed 64-bit integer
        let skip = (self.page - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| ServiceError::invalid(format!("page {} is too large", self.page)))?;
        Ok(Window { skip: skip as u64, take: self.page_size as u64 })
    }
}

impl Default for PageRequest {
    fn default() -> Self { Self { page: 1, page_size: 10 } }
}

/// `ceil(total / page_size)`; zero rows means zero pages.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 { return 0; }
    total.div_ceil(page_size)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// `total` is the full matching-row count, not `data.len()`.
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        let page_size = request.page_size.max(0) as u64;
        Self {
            data,
            meta: PageMeta {
                total,
                page: request.page.max(0) as u64,
                page_size,
                total_pages: total_pages(total, page_size),
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { data: self.data.into_iter().map(f).collect(), meta: self.meta }
    }
}
