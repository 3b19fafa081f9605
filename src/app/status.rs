//! UI status module: flags the presentation layer renders from.

use crate::domain::error::Result;
use crate::store::module::{arg, ActionTable, InitialState, ModuleContext, StoreModule};
use serde_json::{json, Value};
use std::rc::Rc;

/// Namespace the module is registered under.
pub const NAMESPACE: &str = "ui";

/// Welcome, loading, error and total-page display flags.
///
/// `firstLoad` stays on until the first request starts; `error` mirrors the
/// items module's error flag when loading stops.
#[derive(Debug)]
pub struct UiStatusModule {
    ctx: ModuleContext,
}

impl UiStatusModule {
    /// Back to the welcome screen.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn reset(&self) -> Result<()> {
        self.ctx
            .set(json!({ "loading": false, "error": false, "firstLoad": true }))
    }

    /// Loading on, everything else off.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn start_loading(&self) -> Result<()> {
        self.ctx
            .set(json!({ "loading": true, "error": false, "firstLoad": false }))
    }

    /// Loading off; error from `itemsState.error` in `root_state`.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn stop_loading(&self, root_state: &Value) -> Result<()> {
        let error = root_state
            .get("itemsState")
            .and_then(|items| items.get("error"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.ctx.set(json!({ "loading": false, "error": error }))
    }

    /// Flips whether the total page count is shown.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn toggle_total_pages_display(&self) -> Result<bool> {
        let shown = !self.ctx.value("displayTotalPages").as_bool().unwrap_or(false);
        self.ctx.set_value("displayTotalPages", json!(shown))?;
        Ok(shown)
    }
}

impl StoreModule for UiStatusModule {
    type Init = ();

    fn oncreate(ctx: ModuleContext, (): ()) -> (Self, InitialState) {
        let initial = InitialState::new(json!({
            "firstLoad": true,
            "loading": false,
            "error": false,
            "displayTotalPages": false,
        }));
        (Self { ctx }, initial)
    }

    fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn actions(module: &Rc<Self>, table: &mut ActionTable) {
        table
            .bind_sync("reset", module, |m, _| {
                m.reset()?;
                Ok(Value::Null)
            })
            .bind_sync("startLoading", module, |m, _| {
                m.start_loading()?;
                Ok(Value::Null)
            })
            .bind_sync("stopLoading", module, |m, args| {
                m.stop_loading(arg(&args, 0))?;
                Ok(Value::Null)
            })
            .bind_sync("toggleTotalPagesDisplay", module, |m, _| {
                Ok(json!(m.toggle_total_pages_display()?))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRoot;

    #[tokio::test]
    async fn test_loading_cycle() {
        let store = StoreRoot::new(json!({}));
        store.add_module::<UiStatusModule>(NAMESPACE, ());

        store.dispatch("ui/startLoading", vec![]).await;
        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["loading"], json!(true));
        assert_eq!(state["firstLoad"], json!(false));

        store
            .dispatch("ui/stopLoading", vec![json!({ "itemsState": { "error": true } })])
            .await;
        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["loading"], json!(false));
        assert_eq!(state["error"], json!(true));

        store.dispatch("ui/reset", vec![]).await;
        assert_eq!(store.module_state(NAMESPACE).unwrap()["firstLoad"], json!(true));
    }

    #[tokio::test]
    async fn test_toggle_total_pages() {
        let store = StoreRoot::new(json!({}));
        store.add_module::<UiStatusModule>(NAMESPACE, ());

        assert_eq!(store.dispatch("ui/toggleTotalPagesDisplay", vec![]).await, Some(json!(true)));
        assert_eq!(store.dispatch("ui/toggleTotalPagesDisplay", vec![]).await, Some(json!(false)));
    }
}
