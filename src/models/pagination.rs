//! Page parameters shared by every listing

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Items per page when the caller does not say
pub const DEFAULT_PER_PAGE: i64 = 10;
/// Upper bound accepted for `per_page`
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page number accepted; keeps the row offset within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Resolved "Nth page of size K" request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Build from optional query parameters, clamping out-of-range values
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// One page holding everything; for detail views embedding related rows
    pub fn unbounded() -> Self {
        Self {
            page: 1,
            per_page: i64::from(i32::MAX),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Slice an already ordered in-memory sequence
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit() as usize)
            .collect()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    /// Current page number (1-based)
    pub page: i64,
    /// Records per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
        }
    }
}
