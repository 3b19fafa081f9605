//! Pagination module: current page, page bounds and the total-page estimate.
//!
//! The catalog reports `totalItems` as the number of results remaining from
//! the requested offset, not a grand total, so the page count is rebuilt
//! after every request as `currentPage + remaining pages`. Once a prefetch
//! finds an empty page the true end is known and recorded as `lastPage`,
//! which from then on overrides the estimate.
//!
//! # State
//!
//! | Key | Kind | Meaning |
//! |---|---|---|
//! | `currentPage` | plain | 1-based page being displayed |
//! | `itemsPerRequest` | plain | page size, at least 1 |
//! | `totalItems` | plain | remaining-results estimate from the last request |
//! | `lastPage` | plain | hard ceiling, `0` while unknown |
//! | `totalPages` | computed | `lastPage`, else the estimate |
//! | `nextPageExists` | computed | `currentPage < totalPages` |
//! | `previousPageExists` | computed | `currentPage > 1` |
//!
//! `nextPage` and `previousPage` are the only bounds-enforcing writers of
//! `currentPage`.

use crate::domain::error::Result;
use crate::store::module::{arg, ActionTable, InitialState, ModuleContext, StoreModule};
use crate::store::state::{as_number, positive_integer, require_u64, Computed, State};
use serde_json::{json, Value};
use std::rc::Rc;
use tracing::debug;

/// Namespace the module is registered under.
pub const NAMESPACE: &str = "pagination";

/// Page count: `lastPage` when known, otherwise the remaining-items estimate.
///
/// The estimate never drops below `currentPage`.
///
/// # Errors
///
/// Fails when a count field is missing or not a non-negative integer.
pub fn total_pages(state: &State) -> Result<Value> {
    let last_page = require_u64(state, "totalPages", "lastPage")?;
    if last_page != 0 {
        return Ok(json!(last_page));
    }

    let current_page = require_u64(state, "totalPages", "currentPage")?;
    let total_items = require_u64(state, "totalPages", "totalItems")?;
    let per_request = require_u64(state, "totalPages", "itemsPerRequest")?.max(1);

    let remaining_pages = total_items.div_ceil(per_request).saturating_sub(1);
    Ok(json!(current_page + remaining_pages))
}

/// Whether a page after the current one exists.
///
/// # Errors
///
/// Fails when `currentPage` or `totalPages` is not a count.
pub fn next_page_exists(state: &State) -> Result<Value> {
    let current_page = require_u64(state, "nextPageExists", "currentPage")?;
    let total_pages = require_u64(state, "nextPageExists", "totalPages")?;
    Ok(json!(current_page < total_pages))
}

/// Whether a page before the current one exists.
///
/// # Errors
///
/// Fails when `currentPage` is not a count.
pub fn previous_page_exists(state: &State) -> Result<Value> {
    let current_page = require_u64(state, "previousPageExists", "currentPage")?;
    Ok(json!(current_page > 1))
}

/// Tracks the current page and derives page bounds.
#[derive(Debug)]
pub struct PaginationModule {
    ctx: ModuleContext,
}

impl PaginationModule {
    fn count(&self, key: &str) -> u64 {
        self.ctx.value(key).as_u64().unwrap_or(0)
    }

    /// The page currently displayed.
    #[must_use]
    pub fn current_page(&self) -> u64 {
        self.count("currentPage").max(1)
    }

    /// Current page-count estimate or ceiling.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.count("totalPages")
    }

    /// Returns to page 1, forgets `lastPage` and reloads counts from `root_state`.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn reset(&self, root_state: &Value) -> Result<()> {
        debug!("resetting pagination");
        self.ctx.set(json!({ "currentPage": 1, "lastPage": 0 }))?;
        self.update_item_counts(root_state)
    }

    /// Advances one page if a next page exists. Returns the current page.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn next_page(&self) -> Result<u64> {
        if self.ctx.value("nextPageExists") == Value::Bool(true) {
            self.ctx.set_value("currentPage", json!(self.current_page() + 1))?;
        }
        Ok(self.current_page())
    }

    /// Goes back one page if a previous page exists. Returns the current page.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn previous_page(&self) -> Result<u64> {
        if self.ctx.value("previousPageExists") == Value::Bool(true) {
            self.ctx.set_value("currentPage", json!(self.current_page() - 1))?;
        }
        Ok(self.current_page())
    }

    /// Records the last page once the catalog has run out of results.
    ///
    /// Negative or non-numeric input is ignored.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn set_last_page(&self, last_page: &Value) -> Result<()> {
        let Some(last_page) = as_number(last_page).filter(|n| n.is_finite() && *n >= 0.0) else {
            debug!(last_page = %last_page, "ignoring invalid last page");
            return Ok(());
        };
        debug!(last_page, "last page encountered");
        self.ctx.set_value("lastPage", json!(last_page.floor() as u64))
    }

    /// Jumps to `page`. Returns the page actually set.
    ///
    /// Invalid input becomes page 1; a known `lastPage` caps the result.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn set_page(&self, page: &Value) -> Result<u64> {
        let mut page = positive_integer(page).unwrap_or(1);
        let last_page = self.count("lastPage");
        if last_page != 0 {
            page = page.min(last_page);
        }
        self.ctx.set_value("currentPage", json!(page))?;
        Ok(page)
    }

    /// Pulls `itemsPerRequest` and `itemsState.totalItems` from root state.
    ///
    /// Non-positive or non-numeric page sizes clamp to 1 and item counts to 0.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn update_item_counts(&self, root_state: &Value) -> Result<()> {
        let items_per_request = root_state
            .get("itemsPerRequest")
            .and_then(positive_integer)
            .unwrap_or(1);
        let total_items = root_state
            .get("itemsState")
            .and_then(|items| items.get("totalItems"))
            .and_then(as_number)
            .filter(|n| n.is_finite() && *n > 0.0)
            .map_or(0, |n| n.floor() as u64);

        self.ctx.set(json!({
            "itemsPerRequest": items_per_request,
            "totalItems": total_items,
        }))
    }
}

impl StoreModule for PaginationModule {
    type Init = ();

    fn oncreate(ctx: ModuleContext, (): ()) -> (Self, InitialState) {
        let initial = InitialState::new(json!({
            "currentPage": 1,
            "itemsPerRequest": 1,
            "totalItems": 0,
            "lastPage": 0,
        }))
        .computed(Computed::new("totalPages", total_pages))
        .computed(Computed::new("nextPageExists", next_page_exists))
        .computed(Computed::new("previousPageExists", previous_page_exists));

        (Self { ctx }, initial)
    }

    fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn actions(module: &Rc<Self>, table: &mut ActionTable) {
        table
            .bind_sync("reset", module, |m, args| {
                m.reset(arg(&args, 0))?;
                Ok(Value::Null)
            })
            .bind_sync("nextPage", module, |m, _| Ok(json!(m.next_page()?)))
            .bind_sync("previousPage", module, |m, _| Ok(json!(m.previous_page()?)))
            .bind_sync("setLastPage", module, |m, args| {
                m.set_last_page(arg(&args, 0))?;
                Ok(Value::Null)
            })
            .bind_sync("setPage", module, |m, args| Ok(json!(m.set_page(arg(&args, 0))?)))
            .bind_sync("updateItemCounts", module, |m, args| {
                m.update_item_counts(arg(&args, 0))?;
                Ok(Value::Null)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRoot;

    fn counts(current: u64, per: u64, total: u64, last: u64) -> State {
        match json!({
            "currentPage": current,
            "itemsPerRequest": per,
            "totalItems": total,
            "lastPage": last,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn pagination() -> (StoreRoot, Rc<PaginationModule>) {
        let store = StoreRoot::new(json!({}));
        let module = store.add_module::<PaginationModule>(NAMESPACE, ()).unwrap();
        (store, module)
    }

    fn root_state(per: Value, total: Value) -> Value {
        json!({ "itemsPerRequest": per, "itemsState": { "totalItems": total } })
    }

    #[test]
    fn test_total_pages_estimate() {
        assert_eq!(total_pages(&counts(1, 20, 120, 0)).unwrap(), json!(6));
        assert_eq!(total_pages(&counts(3, 20, 41, 0)).unwrap(), json!(5));
        assert_eq!(total_pages(&counts(2, 20, 20, 0)).unwrap(), json!(2));
        assert_eq!(total_pages(&counts(4, 20, 0, 0)).unwrap(), json!(4));
    }

    #[test]
    fn test_last_page_overrides_estimate() {
        assert_eq!(total_pages(&counts(1, 20, 5000, 3)).unwrap(), json!(3));
        assert_eq!(total_pages(&counts(1, 20, 0, 7)).unwrap(), json!(7));
    }

    #[test]
    fn test_initial_state() {
        let (store, _) = pagination();
        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["currentPage"], json!(1));
        assert_eq!(state["totalPages"], json!(1));
        assert_eq!(state["nextPageExists"], json!(false));
        assert_eq!(state["previousPageExists"], json!(false));
    }

    #[test]
    fn test_next_page_stops_at_total_pages() {
        let (store, pagination) = pagination();
        pagination.reset(&root_state(json!(20), json!(60))).unwrap();
        assert_eq!(pagination.total_pages(), 3);

        for _ in 0..10 {
            pagination.next_page().unwrap();
            // Counts are refreshed from the catalog after every page move.
            pagination
                .update_item_counts(&root_state(json!(20), json!(60 - 20 * (pagination.current_page() - 1))))
                .unwrap();
        }
        assert_eq!(pagination.current_page(), 3);
        assert_eq!(store.module_state(NAMESPACE).unwrap()["nextPageExists"], json!(false));
    }

    #[test]
    fn test_previous_page_stops_at_one() {
        let (_, pagination) = pagination();
        pagination.reset(&root_state(json!(20), json!(100))).unwrap();
        pagination.next_page().unwrap();
        pagination.next_page().unwrap();
        assert_eq!(pagination.current_page(), 3);

        for _ in 0..10 {
            pagination.previous_page().unwrap();
        }
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn test_set_last_page_sticks() {
        let (_, pagination) = pagination();
        pagination.reset(&root_state(json!(20), json!(400))).unwrap();
        pagination.set_last_page(&json!(2)).unwrap();
        assert_eq!(pagination.total_pages(), 2);

        pagination.update_item_counts(&root_state(json!(20), json!(9000))).unwrap();
        assert_eq!(pagination.total_pages(), 2);

        pagination.set_last_page(&json!("bogus")).unwrap();
        assert_eq!(pagination.total_pages(), 2);
    }

    #[test]
    fn test_reset_forgets_last_page_and_clamps_counts() {
        let (store, pagination) = pagination();
        pagination.set_last_page(&json!(4)).unwrap();
        pagination.set_page(&json!(3)).unwrap();

        pagination.reset(&root_state(json!(-5), json!("lots"))).unwrap();
        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["currentPage"], json!(1));
        assert_eq!(state["lastPage"], json!(0));
        assert_eq!(state["itemsPerRequest"], json!(1));
        assert_eq!(state["totalItems"], json!(0));
    }

    #[test]
    fn test_set_page_clamps() {
        let (_, pagination) = pagination();
        assert_eq!(pagination.set_page(&json!(0)).unwrap(), 1);
        assert_eq!(pagination.set_page(&json!("7")).unwrap(), 7);
        pagination.set_last_page(&json!(5)).unwrap();
        assert_eq!(pagination.set_page(&json!(9)).unwrap(), 5);
    }

    #[tokio::test]
    async fn test_actions_are_dispatchable() {
        let (store, pagination) = pagination();
        store
            .dispatch("pagination/updateItemCounts", vec![root_state(json!(10), json!(35))])
            .await
            .unwrap();
        assert_eq!(store.dispatch("pagination/nextPage", vec![]).await, Some(json!(2)));
        assert_eq!(store.dispatch("pagination/previousPage", vec![]).await, Some(json!(1)));
        assert_eq!(store.dispatch("pagination/totalPages", vec![]).await, None);
        assert_eq!(pagination.total_pages(), 4);
    }
}
