//! View model computed from the store's root state.
//!
//! The view model is display-ready text: the renderer only decides where each
//! line goes. Nothing in here touches the store; [`UIViewModel::from_root`] is
//! a pure function of a [`RootState`] snapshot.
//!
//! # Example
//!
//! ```rust
//! use book_inquiry::app::state::RootState;
//! use book_inquiry::ui::viewmodel::{Body, UIViewModel};
//!
//! let vm = UIViewModel::from_root(&RootState::default());
//! assert!(matches!(vm.body, Body::Welcome));
//! ```

use crate::app::history::TITLE;
use crate::app::state::RootState;
use crate::domain::Book;

/// Help text shown under the results.
pub const KEYBINDINGS: &str = ":n next | :p previous | :b back | :f forward | :t pages | :q quit";

/// Complete UI view model for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UIViewModel {
    /// Title line.
    pub header: HeaderInfo,
    /// What occupies the main area.
    pub body: Body,
    /// Page indicator, present only when results are shown.
    pub pagination: Option<PaginationInfo>,
    /// Help line.
    pub footer: FooterInfo,
}

/// Header display information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub title: String,
    /// The query being shown, if any.
    pub query: Option<String>,
}

/// Main area content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Nothing searched yet.
    Welcome,
    /// A foreground request is in flight.
    Loading,
    /// The last search failed.
    Failed,
    /// The search returned nothing.
    NoResults { query: String },
    /// One page of results.
    Results(Vec<DisplayItem>),
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    /// 1-based position across all pages.
    pub position: u64,
    pub title: String,
    /// Authors and publisher, joined; empty when neither is known.
    pub byline: String,
    pub link: String,
}

/// Pagination footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: u64,
    /// Only set while the total page display is toggled on.
    pub total_pages: Option<u64>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Footer display information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterInfo {
    pub keybindings: String,
}

impl UIViewModel {
    /// Computes the view model for a root state snapshot.
    ///
    /// Precedence of the main area: loading, then failure, then the welcome
    /// body before the first search, then results.
    #[must_use]
    pub fn from_root(root: &RootState) -> Self {
        let ui = &root.ui_state;
        let items = &root.items_state;

        let body = if ui.loading {
            Body::Loading
        } else if items.error {
            Body::Failed
        } else if ui.first_load {
            Body::Welcome
        } else if items.items.is_empty() {
            Body::NoResults {
                query: root.last_search_value.clone(),
            }
        } else {
            let offset = root
                .pagination_state
                .current_page
                .saturating_sub(1)
                .saturating_mul(root.items_per_request);
            Body::Results(
                items
                    .items
                    .iter()
                    .zip(1u64..)
                    .map(|(book, n)| DisplayItem::new(offset + n, book))
                    .collect(),
            )
        };

        let pagination = matches!(body, Body::Results(_)).then(|| {
            let page = &root.pagination_state;
            PaginationInfo {
                current_page: page.current_page,
                total_pages: ui.display_total_pages.then_some(page.total_pages),
                has_previous: page.previous_page_exists,
                has_next: page.next_page_exists,
            }
        });

        let query = (!root.last_search_value.is_empty()).then(|| root.last_search_value.clone());

        Self {
            header: HeaderInfo {
                title: TITLE.to_string(),
                query,
            },
            body,
            pagination,
            footer: FooterInfo {
                keybindings: KEYBINDINGS.to_string(),
            },
        }
    }
}

impl DisplayItem {
    fn new(position: u64, book: &Book) -> Self {
        let title = if book.title.is_empty() {
            "(untitled)".to_string()
        } else {
            book.title.clone()
        };
        let byline = [book.authors.as_str(), book.publisher.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" · ");

        Self {
            position,
            title,
            byline,
            link: book.info_link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::{ItemsView, PaginationView, UiView};

    fn searched(items: Vec<Book>) -> RootState {
        RootState {
            last_search_value: "dune".to_string(),
            items_per_request: 20,
            items_state: ItemsView {
                error: false,
                total_items: items.len() as u64,
                items,
            },
            pagination_state: PaginationView {
                current_page: 2,
                total_pages: 5,
                last_page: 0,
                next_page_exists: true,
                previous_page_exists: true,
            },
            ui_state: UiView {
                first_load: false,
                ..UiView::default()
            },
            ..RootState::default()
        }
    }

    #[test]
    fn test_results_are_numbered_across_pages() {
        let book = Book {
            title: "Dune".to_string(),
            authors: "Frank Herbert".to_string(),
            publisher: "Chilton".to_string(),
            ..Book::default()
        };
        let vm = UIViewModel::from_root(&searched(vec![book]));

        let Body::Results(rows) = &vm.body else {
            panic!("expected results, got {:?}", vm.body);
        };
        assert_eq!(rows[0].position, 21);
        assert_eq!(rows[0].byline, "Frank Herbert · Chilton");
        assert_eq!(vm.header.query.as_deref(), Some("dune"));

        let pagination = vm.pagination.unwrap();
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, None);
        assert!(pagination.has_next && pagination.has_previous);
    }

    #[test]
    fn test_total_pages_follow_the_toggle() {
        let mut root = searched(vec![Book::default()]);
        root.ui_state.display_total_pages = true;
        let vm = UIViewModel::from_root(&root);
        assert_eq!(vm.pagination.unwrap().total_pages, Some(5));
    }

    #[test]
    fn test_error_and_empty_states() {
        let mut root = searched(vec![]);
        assert_eq!(
            UIViewModel::from_root(&root).body,
            Body::NoResults {
                query: "dune".to_string()
            }
        );

        root.items_state.error = true;
        let vm = UIViewModel::from_root(&root);
        assert_eq!(vm.body, Body::Failed);
        assert!(vm.pagination.is_none());

        root.ui_state.loading = true;
        assert_eq!(UIViewModel::from_root(&root).body, Body::Loading);
    }

    #[test]
    fn test_failure_shows_before_any_search() {
        let mut root = RootState::default();
        root.items_state.error = true;
        assert!(root.ui_state.first_load);
        assert_eq!(UIViewModel::from_root(&root).body, Body::Failed);
    }
}
