//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum number of items per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
        }
    }
}

/// The `page` and `limit` query parameters of a list request.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The number of items per page.
    pub limit: Option<u64>,
}

/// The largest offset or limit SQLite accepts.
const MAX_SQL_INTEGER: u64 = i64::MAX as u64;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub page: u64,
    /// The number of items per page, always greater than zero.
    pub limit: u64,
}

impl Page {
    /// Resolve `query` against the defaults in `config`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the page or limit is zero, or if the
    /// page starts past the largest offset the database can skip to.
    pub fn resolve(query: PageQuery, config: &PaginationConfig) -> Result<Self, Error> {
        let page = query.page.unwrap_or(config.default_page);
        let limit = query.limit.unwrap_or(config.default_page_size);

        if page == 0 {
            return Err(Error::Validation("page must be 1 or greater".to_owned()));
        }

        if limit == 0 {
            return Err(Error::Validation("limit must be 1 or greater".to_owned()));
        }

        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| offset <= MAX_SQL_INTEGER)
            && limit <= MAX_SQL_INTEGER;

        if !in_range {
            return Err(Error::Validation(format!(
                "page {page} with limit {limit} is out of range"
            )));
        }

        Ok(Self { page, limit })
    }

    /// The number of items to skip, `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Describe this page for a result set with `total` items.
    pub fn info(&self, total: u64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            pages: total.div_ceil(self.limit),
        }
    }
}

/// The pagination details sent with a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// The current page number.
    pub page: u64,
    /// The number of items per page.
    pub limit: u64,
    /// The total number of pages.
    pub pages: u64,
}
