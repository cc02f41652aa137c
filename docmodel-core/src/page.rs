//! Offset/limit result pages.
//!
//! [`Page`] is what `find_limit` returns: one slice of matching items plus
//! the total number of matches, so callers can render paging controls
//! without a second count query.

use serde::{Deserialize, Serialize};

/// A single page of results.
///
/// # Example
///
/// ```ignore
/// use docmodel::page::Page;
///
/// let page = Page::slice((1..=15).collect::<Vec<_>>(), 10, 10);
///
/// assert_eq!(page.items, vec![11, 12, 13, 14, 15]);
/// assert_eq!(page.count, 15);
/// assert!(!page.has_more());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of matches across all pages.
    pub count: usize,
    /// Number of matches skipped before this page.
    pub offset: usize,
    /// Requested page size.
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn builder(items: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(items)
    }

    /// Cuts the `offset..offset + limit` window out of the full result list.
    pub fn slice(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let count = all.len();
        let items = all
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();

        Page { items, count, offset, limit }
    }

    /// True when matches exist beyond this page.
    pub fn has_more(&self) -> bool {
        self.offset + self.items.len() < self.count
    }

    /// Offset of the following page, if there is one.
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more().then(|| self.offset + self.items.len())
    }

    /// Converts the items while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            offset: 0,
            limit: 0,
        }
    }
}

/// Builder for [`Page`] when the backend reports the total count separately.
pub struct PageBuilder<T> {
    items: Vec<T>,
    count: Option<usize>,
    offset: usize,
    limit: Option<usize>,
}

impl<T> PageBuilder<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            count: None,
            offset: 0,
            limit: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds the page. Without an explicit count, the count is everything
    /// up to the end of this page; without a limit, the limit is the page length.
    pub fn build(self) -> Page<T> {
        let len = self.items.len();
        Page {
            count: self.count.unwrap_or(self.offset + len),
            limit: self.limit.unwrap_or(len),
            offset: self.offset,
            items: self.items,
        }
    }
}
