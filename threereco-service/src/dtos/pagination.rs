use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::PageRequest;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE: u64 = 1_000_000;

/// Query string accepted by every list endpoint.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[validate(range(min = 1, max = 1_000_000, message = "page must be between 1 and 1000000"))]
    pub page: Option<u64>,

    #[validate(range(min = 1, max = 100, message = "pageSize must be between 1 and 100"))]
    pub page_size: Option<u64>,

    pub search_term: Option<String>,

    pub search_column: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            offset: (self.page() - 1).saturating_mul(self.page_size()),
            limit: self.page_size(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub count: u64,
    pub pages: u64,
    pub page_size: u64,
    pub current_page: u64,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
}

impl Pagination {
    pub fn new(count: u64, page: u64, page_size: u64) -> Self {
        let pages = count.div_ceil(page_size.max(1));
        Self {
            count,
            pages,
            page_size,
            current_page: page,
            next_page: (page < pages).then_some(page + 1),
            previous_page: (page > 1).then(|| page - 1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = ListQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.page_request(), PageRequest { offset: 0, limit: 10 });
    }

    #[test]
    fn test_page_offset() {
        let query = ListQuery {
            page: Some(3),
            page_size: Some(20),
            ..Default::default()
        };
        assert_eq!(query.page_request(), PageRequest { offset: 40, limit: 20 });
    }

    #[test]
    fn test_oversized_page_rejected() {
        let query = ListQuery {
            page_size: Some(500),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_huge_page_rejected_without_overflow() {
        let query = ListQuery {
            page: Some(u64::MAX / 10),
            page_size: Some(100),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let request = query.page_request();
        assert_eq!(request.offset, (MAX_PAGE - 1) * 100);
        assert_eq!(request.limit, 100);
    }

    #[test]
    fn test_last_allowed_page() {
        let query = ListQuery {
            page: Some(MAX_PAGE),
            page_size: Some(MAX_PAGE_SIZE),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
        assert_eq!(query.page_request().offset, (MAX_PAGE - 1) * MAX_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_links() {
        let p = Pagination::new(25, 2, 10);
        assert_eq!(p.pages, 3);
        assert_eq!(p.next_page, Some(3));
        assert_eq!(p.previous_page, Some(1));

        let empty = Pagination::new(0, 1, 10);
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.next_page, None);
        assert_eq!(empty.previous_page, None);
    }
}
