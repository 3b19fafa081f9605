//! Typed views over the store's global state.
//!
//! The store keeps state as JSON so modules stay decoupled; the presentation
//! layer reads it through these views instead of indexing maps by hand.
//! Unknown keys are ignored and missing ones take their defaults.
//!
//! # Example
//!
//! ```rust
//! use book_inquiry::app::state::{initial_root_state, RootState};
//! use serde_json::Value;
//!
//! let Value::Object(state) = initial_root_state(20) else { unreachable!() };
//! let view = RootState::from_state(&state).unwrap();
//! assert_eq!(view.items_per_request, 20);
//! assert!(view.search_value.is_empty());
//! ```

use crate::domain::error::Result;
use crate::domain::Book;
use crate::store::state::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Root-level fields the store starts with.
#[must_use]
pub fn initial_root_state(items_per_request: u64) -> Value {
    json!({
        "itemsPerRequest": items_per_request,
        "lastSearchValue": "",
        "searchValue": "",
    })
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RootState {
    /// Query text being edited or searched.
    pub search_value: String,
    /// Query of the most recent search, shown when it found nothing.
    pub last_search_value: String,
    /// Page size requested from the proxy.
    pub items_per_request: u64,
    /// Published by the `items` module.
    pub items_state: ItemsView,
    /// Published by the `pagination` module.
    pub pagination_state: PaginationView,
    /// Published by the `ui` module.
    pub ui_state: UiView,
}

impl RootState {
    /// Reads the typed view from a global state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BookInquiryError::Json`](crate::domain::BookInquiryError::Json)
    /// if a published field has an unexpected type.
    pub fn from_state(state: &State) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(state.clone()))?)
    }
}

/// Search results as published by the items module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemsView {
    /// The last foreground request failed.
    pub error: bool,
    /// Results on the current page.
    pub items: Vec<Book>,
    /// Remaining-results estimate.
    pub total_items: u64,
}

/// Page bounds as published by the pagination module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationView {
    pub current_page: u64,
    pub total_pages: u64,
    pub last_page: u64,
    pub next_page_exists: bool,
    pub previous_page_exists: bool,
}

impl Default for PaginationView {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            last_page: 0,
            next_page_exists: false,
            previous_page_exists: false,
        }
    }
}

/// Status flags as published by the ui module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiView {
    pub first_load: bool,
    pub loading: bool,
    pub error: bool,
    pub display_total_pages: bool,
}

impl Default for UiView {
    fn default() -> Self {
        Self {
            first_load: true,
            loading: false,
            error: false,
            display_total_pages: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_published_module_state() {
        let Value::Object(state) = json!({
            "searchValue": "dune",
            "itemsPerRequest": 20,
            "itemsState": {
                "error": false,
                "items": [{ "id": "1", "title": "Dune", "authors": "Frank Herbert" }],
                "totalItems": 120,
                "requestUrl": "ignored",
            },
            "paginationState": { "currentPage": 2, "totalPages": 6, "nextPageExists": true },
        }) else {
            unreachable!()
        };

        let view = RootState::from_state(&state).unwrap();
        assert_eq!(view.items_state.items[0].title, "Dune");
        assert_eq!(view.pagination_state.current_page, 2);
        assert!(view.pagination_state.next_page_exists);
        assert!(view.ui_state.first_load);
    }
}
