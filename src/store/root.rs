//! The root store: global state, module registry and action dispatcher.
//!
//! [`StoreRoot`] is an explicitly constructed context object. The
//! presentation layer receives a clone of it at startup; modules receive a
//! weak [`StoreHandle`] so that the registry owns them without reference
//! cycles.
//!
//! # Global state
//!
//! Global state is a flat JSON object. Each registered module publishes its
//! state under a reserved `"<name>State"` key; everything else is a root-level
//! field such as `searchValue` or `itemsPerRequest`. Outside the crate, global
//! state is read-only: changes go through [`StoreRoot::dispatch`].
//!
//! # Dispatch
//!
//! Actions are routed through a two-level registry built at startup:
//!
//! ```text
//! "pagination/nextPage" ──split on first '/'──▶ modules["pagination"]["nextPage"]
//! "newSearch"           ──no '/'────────────▶ root_actions["newSearch"]
//! ```
//!
//! Routing failures are logged and `dispatch` yields `None`; it never returns
//! an error to its caller.

use crate::domain::error::{DispatchError, Result};
use crate::store::module::{ActionResult, ActionTable, Handler, ModuleContext, StoreModule};
use crate::store::scheduler::Scheduler;
use crate::store::state::State;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};
use tracing::Instrument;

type Subscriber = Rc<dyn Fn(&State)>;

/// Callback form of a dispatch trigger.
pub type TriggerFn = Rc<dyn Fn(&StoreRoot, &[Value]) -> Result<()>>;

/// Work run on the next tick after an action has been dispatched.
///
/// Triggers receive the arguments the triggering action was dispatched with.
#[derive(Clone)]
pub enum Trigger {
    /// Dispatch another action.
    Action(String),
    /// Call a function with the store.
    Callback(TriggerFn),
}

impl Trigger {
    /// Wraps a closure as a trigger.
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&StoreRoot, &[Value]) -> Result<()> + 'static,
    {
        Self::Callback(Rc::new(callback))
    }

    async fn fire(&self, root: &StoreRoot, source: &str, args: &[Value]) {
        match self {
            Self::Action(action) => {
                Box::pin(root.dispatch(action, args.to_vec())).await;
            }
            Self::Callback(callback) => {
                if let Err(e) = callback(root, args) {
                    tracing::warn!(action = %source, error = %e, "dispatch trigger failed");
                }
            }
        }
    }
}

impl From<&str> for Trigger {
    fn from(action: &str) -> Self {
        Self::Action(action.to_string())
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

struct RootInner {
    state: RefCell<State>,
    modules: RefCell<HashMap<String, ActionTable>>,
    root_actions: RefCell<ActionTable>,
    triggers: RefCell<HashMap<String, Vec<Trigger>>>,
    subscribers: RefCell<Vec<Subscriber>>,
    scheduler: Scheduler,
}

/// Owner of global state and the action registry.
///
/// Cloning yields another handle to the same store.
///
/// # Example
///
/// ```rust
/// use book_inquiry::store::StoreRoot;
/// use serde_json::{json, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = StoreRoot::new(json!({ "searchValue": "" }));
/// store.add_root_action("ping", |_args| async { Ok(Value::from("pong")) });
///
/// assert_eq!(store.dispatch("ping", vec![]).await, Some(json!("pong")));
/// assert_eq!(store.dispatch("nowhere/ping", vec![]).await, None);
/// # }
/// ```
#[derive(Clone)]
pub struct StoreRoot {
    inner: Rc<RootInner>,
}

impl StoreRoot {
    /// Creates a store with the given root-level fields.
    ///
    /// A non-object initial value is logged and replaced by an empty object.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        let state = match initial {
            Value::Object(map) => map,
            other => {
                tracing::warn!(found = %other, "root state must be an object, starting empty");
                Map::new()
            }
        };

        Self {
            inner: Rc::new(RootInner {
                state: RefCell::new(state),
                modules: RefCell::new(HashMap::new()),
                root_actions: RefCell::new(ActionTable::default()),
                triggers: RefCell::new(HashMap::new()),
                subscribers: RefCell::new(Vec::new()),
                scheduler: Scheduler::new(),
            }),
        }
    }

    /// A weak handle for modules and deferred work.
    #[must_use]
    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The next-tick queue used for triggers and background work.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.inner.scheduler.clone()
    }

    /// Runs deferred work until none is left.
    pub async fn run_until_idle(&self) {
        self.inner.scheduler.run_until_idle().await;
    }

    /// A copy of global state.
    #[must_use]
    pub fn get(&self) -> State {
        self.inner.state.borrow().clone()
    }

    /// One global field, or `null`.
    #[must_use]
    pub fn value(&self, key: &str) -> Value {
        self.inner
            .state
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// The state a module last published, or `None` for an unknown namespace.
    #[must_use]
    pub fn module_state(&self, name: &str) -> Option<State> {
        match self.inner.state.borrow().get(&state_key(name)) {
            Some(Value::Object(state)) => Some(state.clone()),
            _ => None,
        }
    }

    /// Merges root-level fields into global state and notifies subscribers.
    ///
    /// Non-object input is ignored with a warning.
    pub(crate) fn set(&self, partial: Value) {
        let Value::Object(partial) = partial else {
            tracing::warn!("root state update must be an object, ignoring");
            return;
        };
        self.inner.state.borrow_mut().extend(partial);
        self.notify();
    }

    pub(crate) fn set_module_state(&self, namespace: &str, snapshot: State) {
        self.inner
            .state
            .borrow_mut()
            .insert(state_key(namespace), Value::Object(snapshot));
        self.notify();
    }

    /// Registers a module under `name` and returns it.
    ///
    /// Returns `None` (after logging a warning) if the namespace is already
    /// taken or contains a `/`.
    pub fn add_module<M: StoreModule>(&self, name: &str, init: M::Init) -> Option<Rc<M>> {
        if name.is_empty() || name.contains('/') {
            tracing::warn!(module = %name, "addModule error: invalid module name");
            return None;
        }
        if self.inner.modules.borrow().contains_key(name) {
            tracing::warn!(module = %name, "addModule error: module already exists");
            return None;
        }

        let _span = tracing::debug_span!("add_module", module = %name).entered();

        // Reserve the namespace before construction so oncreate can dispatch.
        self.inner
            .modules
            .borrow_mut()
            .insert(name.to_string(), ActionTable::default());
        self.inner
            .state
            .borrow_mut()
            .entry(state_key(name))
            .or_insert_with(|| Value::Object(Map::new()));

        let ctx = ModuleContext::new(name, self.handle());
        let (module, initial) = M::oncreate(ctx, init);
        module.context().install(initial);

        let module = Rc::new(module);
        let mut table = ActionTable::default();
        M::actions(&module, &mut table);
        tracing::debug!(actions = ?table.names(), "module registered");
        self.inner
            .modules
            .borrow_mut()
            .insert(name.to_string(), table);

        Some(module)
    }

    /// Registers an action on the root itself.
    pub fn add_root_action<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = ActionResult> + 'static,
    {
        self.inner.root_actions.borrow_mut().insert(name, handler);
    }

    /// Resolves an action name to its handler.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownModule`] if the namespace is not registered
    /// - [`DispatchError::NotAnAction`] if the name refers to a state field
    /// - [`DispatchError::UnknownAction`] if nothing is registered under the name
    pub fn resolve(&self, action: &str) -> std::result::Result<Handler, DispatchError> {
        if let Some((module, name)) = action.split_once('/') {
            let modules = self.inner.modules.borrow();
            let table = modules
                .get(module)
                .ok_or_else(|| DispatchError::UnknownModule(module.to_string()))?;
            if let Some(handler) = table.get(name) {
                return Ok(handler);
            }
            let is_property = self
                .module_state(module)
                .is_some_and(|state| state.contains_key(name));
            return Err(if is_property {
                DispatchError::NotAnAction(action.to_string())
            } else {
                DispatchError::UnknownAction(action.to_string())
            });
        }

        if let Some(handler) = self.inner.root_actions.borrow().get(action) {
            return Ok(handler);
        }
        Err(if self.inner.state.borrow().contains_key(action) {
            DispatchError::NotAnAction(action.to_string())
        } else {
            DispatchError::UnknownAction(action.to_string())
        })
    }

    /// Invokes an action by name.
    ///
    /// `action` is either a root action (`"newSearch"`) or a module action
    /// (`"pagination/nextPage"`). Triggers registered for the action are
    /// queued once the handler has finished, so they never delay this call.
    ///
    /// Returns `None` when the action cannot be resolved or its handler fails;
    /// both cases are logged.
    pub async fn dispatch(&self, action: &str, args: Vec<Value>) -> Option<Value> {
        let span = tracing::debug_span!("dispatch", action = %action);

        let handler = match self.resolve(action) {
            Ok(handler) => handler,
            Err(e) => {
                span.in_scope(|| tracing::warn!(error = %e, "dispatch failed"));
                return None;
            }
        };

        let trigger_args = args.clone();
        let result = handler(args).instrument(span.clone()).await;
        self.schedule_triggers(action, trigger_args, span.clone());

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                span.in_scope(|| tracing::warn!(error = %e, "action failed"));
                None
            }
        }
    }

    /// Runs `trigger` on the next tick after every dispatch of `action`.
    pub fn add_dispatch_trigger(&self, action: &str, trigger: impl Into<Trigger>) {
        self.inner
            .triggers
            .borrow_mut()
            .entry(action.to_string())
            .or_default()
            .push(trigger.into());
    }

    /// Calls `callback` with global state after every change.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&State) + 'static,
    {
        self.inner.subscribers.borrow_mut().push(Rc::new(callback));
    }

    fn schedule_triggers(&self, action: &str, args: Vec<Value>, span: tracing::Span) {
        let triggers = self
            .inner
            .triggers
            .borrow()
            .get(action)
            .cloned()
            .unwrap_or_default();
        if triggers.is_empty() {
            return;
        }

        let handle = self.handle();
        let source = action.to_string();
        self.inner.scheduler.defer(
            async move {
                let Some(root) = handle.upgrade() else {
                    return;
                };
                for trigger in &triggers {
                    trigger.fire(&root, &source, &args).await;
                }
            }
            .instrument(span),
        );
    }

    fn notify(&self) {
        let subscribers = self.inner.subscribers.borrow().clone();
        if subscribers.is_empty() {
            return;
        }
        let state = self.get();
        for subscriber in subscribers {
            subscriber(&state);
        }
    }
}

impl fmt::Debug for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<String> = self.inner.modules.borrow().keys().cloned().collect();
        modules.sort();
        f.debug_struct("StoreRoot")
            .field("modules", &modules)
            .field("root_actions", &self.inner.root_actions.borrow().names())
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

/// Non-owning reference to a [`StoreRoot`].
///
/// Every operation degrades to a logged no-op once the store is gone.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Weak<RootInner>,
}

impl StoreHandle {
    /// The store, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<StoreRoot> {
        self.inner.upgrade().map(|inner| StoreRoot { inner })
    }

    /// A copy of global state, or an empty map once the store is gone.
    #[must_use]
    pub fn state(&self) -> State {
        self.upgrade().map(|root| root.get()).unwrap_or_default()
    }

    /// Dispatches through the store.
    pub async fn dispatch(&self, action: &str, args: Vec<Value>) -> Option<Value> {
        match self.upgrade() {
            Some(root) => root.dispatch(action, args).await,
            None => {
                tracing::warn!(action = %action, "dispatch on a dropped store");
                None
            }
        }
    }

    /// Merges root-level fields into global state.
    pub(crate) fn set(&self, partial: Value) {
        if let Some(root) = self.upgrade() {
            root.set(partial);
        }
    }

    /// Queues `task` on the store's scheduler.
    pub fn defer<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        if let Some(root) = self.upgrade() {
            root.inner.scheduler.defer(task);
        }
    }

    pub(crate) fn publish(&self, namespace: &str, snapshot: State) {
        if let Some(root) = self.upgrade() {
            root.set_module_state(namespace, snapshot);
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

fn state_key(namespace: &str) -> String {
    format!("{namespace}State")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::BookInquiryError;
    use crate::store::module::{arg, InitialState};
    use crate::store::state::Computed;
    use serde_json::json;
    use std::cell::Cell;

    struct Tally {
        ctx: ModuleContext,
    }

    impl StoreModule for Tally {
        type Init = u64;

        fn oncreate(ctx: ModuleContext, start: u64) -> (Self, InitialState) {
            let initial = InitialState::new(json!({ "count": start })).computed(Computed::new(
                "even",
                |state| Ok(json!(state.get("count").and_then(Value::as_u64).unwrap_or(0) % 2 == 0)),
            ));
            (Self { ctx }, initial)
        }

        fn context(&self) -> &ModuleContext {
            &self.ctx
        }

        fn actions(module: &Rc<Self>, table: &mut ActionTable) {
            table
                .bind_sync("add", module, |tally, args| {
                    let by = arg(&args, 0).as_u64().unwrap_or(1);
                    let count = tally.ctx.value("count").as_u64().unwrap_or(0);
                    tally.ctx.set(json!({ "count": count + by }))?;
                    Ok(json!(count + by))
                })
                .bind_sync("cheat", module, |tally, _| {
                    tally.ctx.set(json!({ "even": false }))?;
                    Ok(Value::Null)
                });
        }
    }

    #[tokio::test]
    async fn test_module_state_is_published_under_namespace() {
        let store = StoreRoot::new(json!({ "searchValue": "" }));
        let tally = store.add_module::<Tally>("tally", 3).unwrap();

        assert_eq!(store.value("tallyState"), json!({ "count": 3, "even": false }));

        assert_eq!(store.dispatch("tally/add", vec![json!(1)]).await, Some(json!(4)));
        assert_eq!(store.module_state("tally").unwrap()["even"], json!(true));
        assert_eq!(tally.ctx.value("count"), json!(4));
    }

    #[tokio::test]
    async fn test_namespace_collision_is_rejected() {
        let store = StoreRoot::new(json!({}));
        assert!(store.add_module::<Tally>("tally", 1).is_some());
        assert!(store.add_module::<Tally>("tally", 99).is_none());
        assert_eq!(store.module_state("tally").unwrap()["count"], json!(1));
    }

    #[tokio::test]
    async fn test_unresolvable_actions_return_none() {
        let store = StoreRoot::new(json!({ "searchValue": "dune" }));
        store.add_module::<Tally>("tally", 0);

        assert_eq!(store.dispatch("missing/add", vec![]).await, None);
        assert_eq!(store.dispatch("tally/missing", vec![]).await, None);
        assert_eq!(store.dispatch("missingRoot", vec![]).await, None);
        assert_eq!(store.dispatch("searchValue", vec![]).await, None);

        assert!(matches!(store.resolve("missing/add"), Err(DispatchError::UnknownModule(m)) if m == "missing"));
        assert!(matches!(store.resolve("tally/count"), Err(DispatchError::NotAnAction(_))));
        assert!(matches!(store.resolve("searchValue"), Err(DispatchError::NotAnAction(_))));
        assert!(matches!(store.resolve("nope"), Err(DispatchError::UnknownAction(_))));
    }

    #[tokio::test]
    async fn test_writing_a_derived_value_fails_the_action() {
        let store = StoreRoot::new(json!({}));
        let tally = store.add_module::<Tally>("tally", 2).unwrap();

        assert_eq!(store.dispatch("tally/cheat", vec![]).await, None);
        let err = tally.ctx.set(json!({ "even": false })).unwrap_err();
        assert!(matches!(err, BookInquiryError::DerivedValue(_)));
        assert_eq!(tally.ctx.value("even"), json!(true));
    }

    #[tokio::test]
    async fn test_triggers_run_on_the_next_tick() {
        let store = StoreRoot::new(json!({}));
        store.add_module::<Tally>("tally", 0);

        let logged = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&logged);
        store.add_root_action("log", move |args| {
            log.borrow_mut().push(args);
            std::future::ready(Ok(Value::Null))
        });
        store.add_dispatch_trigger("tally/add", "log");

        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        store.add_dispatch_trigger(
            "tally/add",
            Trigger::callback(move |root, _| {
                counter.set(root.module_state("tally").map_or(0, |s| s["count"].as_u64().unwrap_or(0)));
                Ok(())
            }),
        );

        assert_eq!(store.dispatch("tally/add", vec![json!(5)]).await, Some(json!(5)));
        assert!(logged.borrow().is_empty());
        assert_eq!(seen.get(), 0);
        assert_eq!(store.scheduler().pending(), 1);

        store.run_until_idle().await;
        assert_eq!(*logged.borrow(), vec![vec![json!(5)]]);
        assert_eq!(seen.get(), 5);
    }

    #[tokio::test]
    async fn test_failing_trigger_is_contained() {
        let store = StoreRoot::new(json!({}));
        store.add_module::<Tally>("tally", 0);
        store.add_dispatch_trigger(
            "tally/add",
            Trigger::callback(|_, _| Err(BookInquiryError::Upstream("boom".to_string()))),
        );

        assert_eq!(store.dispatch("tally/add", vec![]).await, Some(json!(1)));
        store.run_until_idle().await;
        assert_eq!(store.module_state("tally").unwrap()["count"], json!(1));
    }

    #[tokio::test]
    async fn test_subscribers_see_every_change() {
        let store = StoreRoot::new(json!({}));
        let renders = Rc::new(Cell::new(0));
        let counter = Rc::clone(&renders);
        store.subscribe(move |state| {
            if state.contains_key("tallyState") {
                counter.set(counter.get() + 1);
            }
        });

        store.add_module::<Tally>("tally", 0);
        store.dispatch("tally/add", vec![]).await;
        assert_eq!(renders.get(), 2);
    }
}
