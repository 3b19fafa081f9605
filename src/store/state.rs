//! Tagged module state and the computed-property engine.
//!
//! A module's state is split into two disjoint halves: plain values, written
//! only through [`ModuleState::merge`], and computed values, written only by
//! [`ModuleState::recompute_all`]. A key belongs to exactly one half for its
//! whole lifetime.
//!
//! # Evaluation
//!
//! Computed properties run in registration order after every mutation. Each
//! receives a snapshot copy of the state that already includes the results of
//! the properties evaluated before it, so later properties may depend on
//! earlier ones. A failing property is logged and keeps its previous value;
//! the remaining properties are still evaluated.
//!
//! # Example
//!
//! ```rust
//! use book_inquiry::store::state::{Computed, ModuleState};
//! use serde_json::json;
//!
//! let doubled = Computed::new("doubled", |state| {
//!     let n = state.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
//!     Ok(json!(n * 2))
//! });
//!
//! let mut state = ModuleState::new(json!({ "n": 2 }), vec![doubled]).unwrap();
//! state.merge(json!({ "n": 5 })).unwrap();
//! state.recompute_all();
//! assert_eq!(state.value("doubled"), json!(10));
//! ```

use crate::domain::error::{BookInquiryError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// A key/value snapshot of state.
pub type State = Map<String, Value>;

/// A pure function deriving a value from a state snapshot.
pub type ComputeFn = Rc<dyn Fn(&State) -> Result<Value>>;

/// A named computed property.
#[derive(Clone)]
pub struct Computed {
    name: String,
    compute: ComputeFn,
}

impl Computed {
    /// Creates a computed property from a pure function.
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&State) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            compute: Rc::new(compute),
        }
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the property against a snapshot.
    ///
    /// # Errors
    ///
    /// Returns whatever error the compute function reports.
    pub fn evaluate(&self, snapshot: &State) -> Result<Value> {
        (self.compute)(snapshot)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// State container holding plain values and computed properties.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    plain: State,
    computed: Vec<Computed>,
    derived: State,
}

impl ModuleState {
    /// Builds state from an initial JSON object and a list of computed properties.
    ///
    /// Computed values start as `null` (the "unset" sentinel) and are then
    /// evaluated once, so dependents never observe a missing key.
    ///
    /// # Errors
    ///
    /// - [`BookInquiryError::StateShape`] if `initial` is not a JSON object
    /// - [`BookInquiryError::DerivedValue`] if `initial` contains a computed key
    pub fn new(initial: Value, computed: Vec<Computed>) -> Result<Self> {
        let plain = into_object(initial)?;
        if let Some(clash) = computed.iter().find(|c| plain.contains_key(c.name())) {
            return Err(BookInquiryError::DerivedValue(clash.name().to_string()));
        }

        Ok(Self::with_plain(plain, computed))
    }

    /// Builds state with no plain values.
    #[must_use]
    pub fn empty(computed: Vec<Computed>) -> Self {
        Self::with_plain(State::new(), computed)
    }

    fn with_plain(plain: State, computed: Vec<Computed>) -> Self {
        let derived = computed
            .iter()
            .map(|c| (c.name().to_string(), Value::Null))
            .collect();
        let mut state = Self {
            plain,
            computed,
            derived,
        };
        state.recompute_all();
        state
    }

    /// Whether `key` names a computed property.
    #[must_use]
    pub fn is_computed(&self, key: &str) -> bool {
        self.computed.iter().any(|c| c.name() == key)
    }

    /// Current value of `key`, or `null` if absent.
    #[must_use]
    pub fn value(&self, key: &str) -> Value {
        self.derived
            .get(key)
            .or_else(|| self.plain.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// A shallow copy of all plain and computed values.
    #[must_use]
    pub fn snapshot(&self) -> State {
        let mut snapshot = self.plain.clone();
        for (key, value) in &self.derived {
            snapshot.insert(key.clone(), value.clone());
        }
        snapshot
    }

    /// Merges `partial` into the plain values.
    ///
    /// The merge is all-or-nothing: if any key is computed, nothing is written.
    /// Callers run [`recompute_all`](Self::recompute_all) afterwards.
    ///
    /// # Errors
    ///
    /// - [`BookInquiryError::StateShape`] if `partial` is not a JSON object
    /// - [`BookInquiryError::DerivedValue`] if a key names a computed property
    pub fn merge(&mut self, partial: Value) -> Result<()> {
        let partial = into_object(partial)?;
        if let Some(key) = partial.keys().find(|key| self.is_computed(key)) {
            return Err(BookInquiryError::DerivedValue(key.clone()));
        }
        self.plain.extend(partial);
        Ok(())
    }

    /// Re-evaluates every computed property in registration order.
    pub fn recompute_all(&mut self) {
        let mut snapshot = self.snapshot();
        for computed in &self.computed {
            match computed.evaluate(&snapshot) {
                Ok(value) => {
                    snapshot.insert(computed.name().to_string(), value.clone());
                    self.derived.insert(computed.name().to_string(), value);
                }
                Err(e) => {
                    tracing::warn!(
                        property = computed.name(),
                        error = %e,
                        "computed property failed, keeping previous value"
                    );
                }
            }
        }
    }
}

fn into_object(value: Value) -> Result<State> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BookInquiryError::StateShape(json_type(&other).to_string())),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Interprets a JSON value as a number the way a loose numeric cast would.
///
/// Numbers pass through; strings are trimmed and parsed (an empty string is
/// not a number). Everything else yields `None`.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Interprets a JSON value as an integer of at least 1.
///
/// Fractions are floored; non-numeric, non-finite and sub-1 input yields `None`.
#[must_use]
pub fn positive_integer(value: &Value) -> Option<u64> {
    as_number(value)
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n.floor() as u64)
}

/// Reads a non-negative integer field that a computed property depends on.
///
/// # Errors
///
/// Returns [`BookInquiryError::Computed`] naming `property` if the field is
/// missing or not a non-negative integer.
pub fn require_u64(state: &State, property: &str, field: &str) -> Result<u64> {
    state
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| BookInquiryError::computed(property, format!("\"{field}\" is not a count")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn doubled() -> Computed {
        Computed::new("doubled", |state| Ok(json!(require_u64(state, "doubled", "n")? * 2)))
    }

    #[test]
    fn test_computed_initialized_before_first_read() {
        let state = ModuleState::new(json!({ "n": 4 }), vec![doubled()]).unwrap();
        assert_eq!(state.value("doubled"), json!(8));
        assert_eq!(state.snapshot().len(), 2);
    }

    #[test]
    fn test_non_object_state_is_rejected() {
        for bad in [json!([1, 2]), Value::Null, json!(3), json!("state")] {
            let err = ModuleState::new(bad, vec![]).unwrap_err();
            assert!(matches!(err, BookInquiryError::StateShape(_)));
        }
    }

    #[test]
    fn test_merge_rejects_derived_keys_atomically() {
        let mut state = ModuleState::new(json!({ "n": 1 }), vec![doubled()]).unwrap();
        let err = state.merge(json!({ "n": 9, "doubled": 3 })).unwrap_err();
        assert!(matches!(err, BookInquiryError::DerivedValue(key) if key == "doubled"));
        assert_eq!(state.value("n"), json!(1));
    }

    #[test]
    fn test_failing_property_keeps_previous_value_and_others_still_run() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let counted = Computed::new("counted", move |_| {
            counter.set(counter.get() + 1);
            Ok(json!(counter.get()))
        });

        let mut state = ModuleState::new(json!({ "n": 2 }), vec![doubled(), counted]).unwrap();
        assert_eq!(state.value("doubled"), json!(4));

        state.merge(json!({ "n": "not a number" })).unwrap();
        state.recompute_all();

        assert_eq!(state.value("doubled"), json!(4));
        assert_eq!(state.value("counted"), json!(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_later_properties_see_earlier_results() {
        let quadrupled = Computed::new("quadrupled", |state| {
            Ok(json!(require_u64(state, "quadrupled", "doubled")? * 2))
        });
        let state = ModuleState::new(json!({ "n": 3 }), vec![doubled(), quadrupled]).unwrap();
        assert_eq!(state.value("quadrupled"), json!(12));
    }

    #[test]
    fn test_positive_integer() {
        assert_eq!(positive_integer(&json!(3)), Some(3));
        assert_eq!(positive_integer(&json!("20")), Some(20));
        assert_eq!(positive_integer(&json!(2.7)), Some(2));
        assert_eq!(positive_integer(&json!(0)), None);
        assert_eq!(positive_integer(&json!(-1)), None);
        assert_eq!(positive_integer(&json!("abc")), None);
        assert_eq!(positive_integer(&Value::Null), None);
    }
}
