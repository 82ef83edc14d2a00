/// Page requests and paged results

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request
///
/// Out-of-range values are clamped rather than rejected: page 0 reads as
/// page 1, and sizes are held to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            size: self.size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.clamped().size)
    }

    pub fn offset(&self) -> i64 {
        let page = self.clamped();
        i64::from(page.page - 1) * i64::from(page.size)
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let request = request.clamped();
        let size = i64::from(request.size);
        let total_pages = ((total.max(0) + size - 1) / size) as u32;

        Self {
            items,
            page: request.page,
            size: request.size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PageRequest { page: 1, size: 10 });
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn test_clamping() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.size, MAX_PAGE_SIZE);

        assert_eq!(PageRequest { page: 3, size: 0 }.limit(), 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Page::<()>::new(vec![], PageRequest::new(1, 10), 0).total_pages, 0);
        assert_eq!(Page::<()>::new(vec![], PageRequest::new(1, 10), 10).total_pages, 1);
        assert_eq!(Page::<()>::new(vec![], PageRequest::new(1, 10), 11).total_pages, 2);
    }
}
