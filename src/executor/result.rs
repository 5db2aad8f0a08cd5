//! Paged result types

use serde::Serialize;

/// Position of a page within the matched set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Zero-based page number
    pub number: usize,
    pub size: usize,
    /// Number of items matching the query, independent of paging
    pub total_elements: u64,
}

/// A page of items with count metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedItems<T> {
    pub items: Vec<T>,
    /// Size of the unfiltered collection
    pub total: u64,
    pub page: Page,
}

impl<T> PagedItems<T> {
    /// Pages an already filtered and sorted list held in memory
    pub fn paginate(matched: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_elements = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();
        Self {
            items,
            total,
            page: Page {
                number: request.number,
                size: request.size,
                total_elements,
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedItems<U> {
        PagedItems {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }
}

/// Requested page bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }

    pub fn offset(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let paged = PagedItems::paginate(vec![1, 2, 3, 4, 5], 9, PageRequest::new(1, 2));
        assert_eq!(paged.items, vec![3, 4]);
        assert_eq!(paged.total, 9);
        assert_eq!(paged.page.total_elements, 5);

        let past_end = PagedItems::paginate(vec![1, 2], 2, PageRequest::new(3, 2));
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.page.total_elements, 2);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let paged = PagedItems::paginate(vec!["a"], 1, PageRequest::new(0, 10));
        let json = serde_json::to_value(&paged).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": ["a"],
                "total": 1,
                "page": {"number": 0, "size": 10, "totalElements": 1}
            })
        );
    }
}
