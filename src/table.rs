//! Client-side search and pagination shared by the preview and results tables.

use crate::model::{ContactRecord, SendResult};

pub const PAGE_SIZE: usize = 10;
/// Maximum number of page links shown at once.
const MAX_PAGE_LINKS: usize = 5;

/// A row that can be matched against a search term.
pub trait Searchable {
    /// Every field rendered as a string, in column order.
    fn field_values(&self) -> Vec<String>;

    fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self
                .field_values()
                .iter()
                .any(|v| v.to_lowercase().contains(needle_lower))
    }
}

impl Searchable for ContactRecord {
    fn field_values(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.name.clone(),
            self.company.clone(),
            self.product.clone(),
            self.quantity.to_string(),
            self.port.clone(),
            self.address.clone(),
        ]
    }
}

impl Searchable for SendResult {
    fn field_values(&self) -> Vec<String> {
        let mut v = vec![
            self.email.clone(),
            self.name.clone(),
            self.company.clone(),
            self.status.as_str().to_string(),
        ];
        if let Some(reason) = &self.error_reason {
            v.push(reason.clone());
        }
        v
    }
}

/// Search term and current page. Everything else is derived on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    search_term: String,
    current_page: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            current_page: 1,
        }
    }
}

impl TableView {
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Replace the search term. The current page is left alone.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Rows matching the search term, in their original order.
    pub fn filter<'a, R: Searchable>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let needle = self.search_term.to_lowercase();
        rows.iter().filter(|r| r.matches(&needle)).collect()
    }

    /// Visible window for the current page. Out-of-range pages give an empty window.
    pub fn visible<'a, R: Searchable>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let filtered = self.filter(rows);
        page_window(&filtered, self.current_page)
            .iter()
            .copied()
            .collect()
    }

    pub fn total_pages<R: Searchable>(&self, rows: &[R]) -> usize {
        total_pages(self.filter(rows).len())
    }

    pub fn prev_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.current_page = (self.current_page + 1).min(total_pages).max(1);
    }

    /// Jump to `page`, clamped into the valid range.
    pub fn go_to(&mut self, page: usize, total_pages: usize) {
        self.current_page = page.clamp(1, total_pages.max(1));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn total_pages(filtered_len: usize) -> usize {
    filtered_len.div_ceil(PAGE_SIZE)
}

/// Slice of `rows` shown on 1-based `page`.
pub fn page_window<T>(rows: &[T], page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    if page == 0 || start >= rows.len() {
        return &[];
    }
    let end = (start + PAGE_SIZE).min(rows.len());
    &rows[start..end]
}

/// Page numbers to render as links: at most five, sliding with the current page.
pub fn page_numbers(current_page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= MAX_PAGE_LINKS {
        return (1..=total_pages).collect();
    }
    let first = if current_page <= 3 {
        1
    } else if current_page >= total_pages - 2 {
        total_pages - (MAX_PAGE_LINKS - 1)
    } else {
        current_page - 2
    };
    (first..first + MAX_PAGE_LINKS).collect()
}

/// `(from, to, of)` for the "Showing X to Y of Z entries" caption.
pub fn showing_range(current_page: usize, filtered_len: usize) -> (usize, usize, usize) {
    let start = current_page.saturating_sub(1) * PAGE_SIZE;
    let from = if filtered_len > 0 { start + 1 } else { 0 };
    let to = (start + PAGE_SIZE).min(filtered_len);
    (from, to, filtered_len)
}
