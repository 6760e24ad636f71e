//! Local filter/paginate engine shared by every catalog list.
//!
//! DESIGN
//! ======
//! Filtering and paging run over the in-memory copy of a collection; the
//! backend return order is preserved, nothing is re-sorted. A blank search
//! term means "no filter". Pages are 1-based and out-of-range pages are
//! simply empty.

use crate::config::DEFAULT_PAGE_SIZE;

/// Records that expose a fixed set of text fields to the search box.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

/// Keep the records whose searchable fields contain `term`, ignoring case.
#[must_use]
pub fn filter<'a, T: Searchable>(records: &'a [T], term: &str) -> Vec<&'a T> {
    filter_with(records, term, Searchable::search_fields)
}

/// Like [`filter`], with the searched fields chosen by `fields`.
#[must_use]
pub fn filter_with<'a, T, F>(records: &'a [T], term: &str, fields: F) -> Vec<&'a T>
where
    F: Fn(&'a T) -> Vec<&'a str>,
{
    if term.trim().is_empty() {
        return records.iter().collect();
    }
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|record| {
            fields(*record)
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Slice `[(page-1)*page_size, page*page_size)` clamped to `records`.
#[must_use]
pub fn paginate<T>(records: &[T], page_size: usize, page: usize) -> &[T] {
    let Some(start) = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
    else {
        return &[];
    };
    if start >= records.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(records.len());
    &records[start..end]
}

/// Number of pages needed for `total` records.
#[must_use]
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 { 0 } else { total.div_ceil(page_size) }
}

// =============================================================================
// LIST VIEW
// =============================================================================

/// Search box + pager state for one list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    term: String,
    page: usize,
    page_size: usize,
}

impl ListView {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self { term: String::new(), page: 1, page_size }
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the search term. Always returns to the first page.
    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Filtered records, all pages.
    #[must_use]
    pub fn filtered<'a, T: Searchable>(&self, records: &'a [T]) -> Vec<&'a T> {
        filter(records, &self.term)
    }

    /// Filtered records on the current page.
    #[must_use]
    pub fn visible<'a, T: Searchable>(&self, records: &'a [T]) -> Vec<&'a T> {
        let filtered = self.filtered(records);
        paginate(&filtered, self.page_size, self.page).to_vec()
    }

    #[must_use]
    pub fn page_count<T: Searchable>(&self, records: &[T]) -> usize {
        page_count(self.filtered(records).len(), self.page_size)
    }
}

impl Default for ListView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
