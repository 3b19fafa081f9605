//! Warm-up module: wakes the proxy before the first search.
//!
//! The proxy runs on on-demand infrastructure, so the client pings it when it
//! starts. Responses are never inspected and failures are ignored.

use crate::infrastructure::http::Fetch;
use crate::store::module::{ActionTable, InitialState, ModuleContext, StoreModule};
use serde_json::{json, Value};
use std::rc::Rc;
use tracing::debug;

/// Namespace the module is registered under.
pub const NAMESPACE: &str = "ping";

/// Resources handed to [`WarmupModule`] at creation.
pub struct WarmupInit {
    /// Network capability.
    pub fetch: Rc<dyn Fetch>,
    /// Proxy base URL, ending in `/`.
    pub base_url: String,
}

/// Fire-and-forget requests to the proxy's warm-up endpoints.
pub struct WarmupModule {
    ctx: ModuleContext,
    fetch: Rc<dyn Fetch>,
    base_url: String,
}

impl WarmupModule {
    async fn touch(&self, endpoint: &str) {
        let url = format!("{}{endpoint}", self.base_url);
        match self.fetch.get(&url).await {
            Ok(response) => debug!(url = %url, status = response.status, "warm-up request answered"),
            Err(e) => debug!(url = %url, error = %e, "warm-up request failed"),
        }
        let count = self.ctx.value("requests").as_u64().unwrap_or(0);
        if let Err(e) = self.ctx.set_value("requests", json!(count + 1)) {
            debug!(error = %e, "could not record warm-up request");
        }
    }

    /// `GET <base>ping`, ignoring the outcome.
    pub async fn ping_server(&self) {
        self.touch("ping").await;
    }

    /// `GET <base>poke`, ignoring the outcome.
    pub async fn poke_server(&self) {
        self.touch("poke").await;
    }
}

impl StoreModule for WarmupModule {
    type Init = WarmupInit;

    fn oncreate(ctx: ModuleContext, init: WarmupInit) -> (Self, InitialState) {
        let module = Self {
            ctx,
            fetch: init.fetch,
            base_url: init.base_url,
        };
        (module, InitialState::new(json!({ "requests": 0 })))
    }

    fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn actions(module: &Rc<Self>, table: &mut ActionTable) {
        table
            .bind("pingServer", module, |m, _| async move {
                m.ping_server().await;
                Ok(Value::Null)
            })
            .bind("pokeServer", module, |m, _| async move {
                m.poke_server().await;
                Ok(Value::Null)
            });
    }
}
