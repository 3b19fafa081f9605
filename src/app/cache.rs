//! Search result cache scoped to one query.
//!
//! Pages are keyed by `startIndex`. The cache belongs to exactly one search
//! string at a time; admitting entries for a different search first clears
//! everything cached for the previous one.

use crate::domain::Book;
use std::collections::HashMap;

/// One cached page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedPage {
    /// Results in catalog order.
    pub items: Vec<Book>,
    /// The catalog's remaining-results estimate reported with the page.
    pub total_items: u64,
}

/// Pages of results for the current search.
#[derive(Debug, Clone, Default)]
pub struct SearchResultCache {
    cached_search: String,
    pages: HashMap<u64, CachedPage>,
}

impl SearchResultCache {
    /// Creates an empty cache bound to no search.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The search the cached pages belong to; empty when unbound.
    #[must_use]
    pub fn cached_search(&self) -> &str {
        &self.cached_search
    }

    /// Whether the cache currently belongs to `search`.
    #[must_use]
    pub fn is_current(&self, search: &str) -> bool {
        !self.cached_search.is_empty() && self.cached_search == search
    }

    /// Binds the cache to `search`, clearing it if it belonged to another.
    ///
    /// Returns `true` when previously cached pages were dropped.
    pub fn ensure_search(&mut self, search: &str) -> bool {
        if self.cached_search == search {
            return false;
        }
        let dropped = !self.pages.is_empty();
        self.pages.clear();
        self.cached_search = search.to_string();
        dropped
    }

    /// The page cached at `start_index` for `search`.
    #[must_use]
    pub fn get(&self, search: &str, start_index: u64) -> Option<&CachedPage> {
        if self.cached_search != search {
            return None;
        }
        self.pages.get(&start_index)
    }

    /// Whether a page is cached at `start_index` for `search`.
    #[must_use]
    pub fn contains(&self, search: &str, start_index: u64) -> bool {
        self.get(search, start_index).is_some()
    }

    /// Stores a page fetched for `search`.
    ///
    /// The write is dropped (returning `false`) when the cache has since moved
    /// on to another search, so a late response can never leak into a newer
    /// query's pages.
    pub fn insert(&mut self, search: &str, start_index: u64, page: CachedPage) -> bool {
        if self.cached_search != search {
            return false;
        }
        self.pages.insert(start_index, page);
        true
    }

    /// Unbinds the cache and drops every page.
    pub fn clear(&mut self) {
        self.cached_search.clear();
        self.pages.clear();
    }

    /// Number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no pages are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u64) -> CachedPage {
        CachedPage {
            items: vec![Book {
                id: n.to_string(),
                ..Book::default()
            }],
            total_items: n,
        }
    }

    #[test]
    fn test_switching_search_clears_pages() {
        let mut cache = SearchResultCache::new();
        assert!(!cache.ensure_search("dune"));
        assert!(cache.insert("dune", 0, page(1)));
        assert!(cache.insert("dune", 20, page(2)));
        assert_eq!(cache.len(), 2);

        assert!(!cache.ensure_search("dune"));
        assert_eq!(cache.len(), 2);

        assert!(cache.ensure_search("emma"));
        assert!(cache.is_empty());
        assert!(cache.get("dune", 0).is_none());
    }

    #[test]
    fn test_insert_for_superseded_search_is_dropped() {
        let mut cache = SearchResultCache::new();
        cache.ensure_search("dune");
        cache.ensure_search("emma");

        assert!(!cache.insert("dune", 20, page(9)));
        assert!(!cache.contains("emma", 20));
        assert!(cache.is_current("emma"));
    }

    #[test]
    fn test_clear_unbinds() {
        let mut cache = SearchResultCache::new();
        cache.ensure_search("dune");
        cache.insert("dune", 0, page(1));
        cache.clear();

        assert_eq!(cache.cached_search(), "");
        assert!(!cache.is_current("dune"));
        assert!(!cache.insert("dune", 0, page(1)));
    }
}
