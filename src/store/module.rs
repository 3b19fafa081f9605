//! Store modules: namespaced state containers composed into the root store.
//!
//! A module is any type implementing [`StoreModule`]. It owns a
//! [`ModuleContext`], which holds the module's [`ModuleState`] and a handle
//! back to the root for publishing state, reading global state, dispatching
//! actions on other modules, and deferring work.
//!
//! # Lifecycle
//!
//! 1. [`StoreRoot::add_module`](crate::store::StoreRoot::add_module) creates a
//!    context for the namespace.
//! 2. [`StoreModule::oncreate`] receives the context and the module's
//!    resources (fetch capability, history backend...) and returns the module
//!    plus its starting state.
//! 3. The starting state is installed and published to the root.
//! 4. [`StoreModule::actions`] binds the module's methods into an
//!    [`ActionTable`] that the dispatcher routes `"<namespace>/<action>"` to.
//!
//! Modules are never removed.

use crate::domain::error::Result;
use crate::store::root::StoreHandle;
use crate::store::state::{Computed, ModuleState, State};
use futures_util::future::LocalBoxFuture;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// What an action resolves to.
pub type ActionResult = Result<Value>;

/// Boxed future returned by an action handler.
pub type ActionFuture = LocalBoxFuture<'static, ActionResult>;

/// A bound action handler taking positional JSON arguments.
pub type Handler = Rc<dyn Fn(Vec<Value>) -> ActionFuture>;

static NULL: Value = Value::Null;

/// Positional argument `index`, or `null` when the caller passed fewer.
#[must_use]
pub fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Name-to-handler table for one namespace.
#[derive(Clone, Default)]
pub struct ActionTable {
    handlers: HashMap<String, Handler>,
}

impl ActionTable {
    /// Registers a handler under `name`, replacing any previous one.
    pub fn insert<F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = ActionResult> + 'static,
    {
        self.handlers
            .insert(name.to_string(), Rc::new(move |args| Box::pin(handler(args))));
        self
    }

    /// Binds an asynchronous method of `module` under `name`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use book_inquiry::store::ActionTable;
    /// use serde_json::Value;
    /// use std::rc::Rc;
    ///
    /// struct Greeter;
    /// impl Greeter {
    ///     async fn greet(&self) -> String { "hello".to_string() }
    /// }
    ///
    /// let mut table = ActionTable::default();
    /// table.bind("greet", &Rc::new(Greeter), |greeter, _args| async move {
    ///     Ok(Value::String(greeter.greet().await))
    /// });
    /// assert!(table.get("greet").is_some());
    /// ```
    pub fn bind<M, F, Fut>(&mut self, name: &str, module: &Rc<M>, method: F) -> &mut Self
    where
        M: 'static,
        F: Fn(Rc<M>, Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = ActionResult> + 'static,
    {
        let module = Rc::clone(module);
        self.insert(name, move |args| method(Rc::clone(&module), args))
    }

    /// Binds a synchronous method of `module` under `name`.
    pub fn bind_sync<M, F>(&mut self, name: &str, module: &Rc<M>, method: F) -> &mut Self
    where
        M: 'static,
        F: Fn(&M, Vec<Value>) -> ActionResult + 'static,
    {
        let module = Rc::clone(module);
        self.insert(name, move |args| std::future::ready(method(&module, args)))
    }

    /// Looks up a handler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTable")
            .field("actions", &self.names())
            .finish()
    }
}

/// Starting state produced by [`StoreModule::oncreate`].
#[derive(Debug, Clone)]
pub struct InitialState {
    /// Plain values; must be a JSON object.
    pub state: Value,
    /// Computed properties, in evaluation order.
    pub computed: Vec<Computed>,
}

impl InitialState {
    /// Plain starting values with no computed properties.
    #[must_use]
    pub fn new(state: Value) -> Self {
        Self {
            state,
            computed: Vec::new(),
        }
    }

    /// Appends a computed property.
    #[must_use]
    pub fn computed(mut self, computed: Computed) -> Self {
        self.computed.push(computed);
        self
    }
}

impl From<Value> for InitialState {
    fn from(state: Value) -> Self {
        Self::new(state)
    }
}

/// Per-module state plus the module's view of the root store.
pub struct ModuleContext {
    namespace: String,
    state: RefCell<ModuleState>,
    store: StoreHandle,
}

impl ModuleContext {
    pub(crate) fn new(namespace: &str, store: StoreHandle) -> Self {
        Self {
            namespace: namespace.to_string(),
            state: RefCell::new(ModuleState::default()),
            store,
        }
    }

    /// Installs the starting state and publishes it.
    ///
    /// A malformed starting state is logged and replaced by an empty one.
    pub(crate) fn install(&self, initial: InitialState) {
        let fallback = initial.computed.clone();
        let state = ModuleState::new(initial.state, initial.computed).unwrap_or_else(|e| {
            tracing::warn!(
                module = %self.namespace,
                error = %e,
                "invalid initial state, falling back to empty state"
            );
            ModuleState::empty(fallback)
        });
        *self.state.borrow_mut() = state;
        self.publish();
    }

    /// The namespace this module is registered under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Handle to the root store.
    #[must_use]
    pub const fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// A shallow copy of the module's current state, plain and computed.
    #[must_use]
    pub fn get(&self) -> State {
        self.state.borrow().snapshot()
    }

    /// Current value of one property, or `null`.
    #[must_use]
    pub fn value(&self, key: &str) -> Value {
        self.state.borrow().value(key)
    }

    /// Merges `partial` into state, recomputes derived values and publishes.
    ///
    /// # Errors
    ///
    /// - [`BookInquiryError::StateShape`](crate::domain::BookInquiryError::StateShape)
    ///   if `partial` is not an object
    /// - [`BookInquiryError::DerivedValue`](crate::domain::BookInquiryError::DerivedValue)
    ///   if `partial` writes a computed property; nothing is written in that case
    pub fn set(&self, partial: Value) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            state.merge(partial)?;
            state.recompute_all();
        }
        self.publish();
        Ok(())
    }

    /// Sets a single property; shorthand for [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), value);
        self.set(Value::Object(partial))
    }

    /// A copy of the root store's global state.
    #[must_use]
    pub fn root_state(&self) -> State {
        self.store.state()
    }

    /// Dispatches an action through the root store.
    pub async fn dispatch(&self, action: &str, args: Vec<Value>) -> Option<Value> {
        self.store.dispatch(action, args).await
    }

    /// Defers `task` to the next turn of the event loop.
    pub fn defer<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.store.defer(task);
    }

    fn publish(&self) {
        let snapshot = self.state.borrow().snapshot();
        self.store.publish(&self.namespace, snapshot);
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("namespace", &self.namespace)
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// A namespaced unit of store composition.
pub trait StoreModule: Sized + 'static {
    /// Resources the module captures at construction.
    type Init;

    /// Builds the module around its context and returns its starting state.
    fn oncreate(ctx: ModuleContext, init: Self::Init) -> (Self, InitialState);

    /// The module's context.
    fn context(&self) -> &ModuleContext;

    /// Binds the module's actions.
    fn actions(module: &Rc<Self>, table: &mut ActionTable);
}
