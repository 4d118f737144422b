#![forbid(unsafe_code)]

//! Property observer: installs change accessors on container keys.
//!
//! [`observe`] walks a value and, for every map it finds (including maps
//! nested in lists), installs the change callback on each key that does not
//! have one yet. From then on every distinct-value write through
//! [`DataContainer::set`] runs the callback once, synchronously.
//!
//! # Invariants
//!
//! 1. Observing a non-container value is a silent no-op.
//! 2. Observing the same container twice never wraps an accessor twice;
//!    only keys added since the last pass are instrumented.
//! 3. Nested containers share the callback of the key that holds them, and
//!    the callback receives the nested key name.
//! 4. A pass that descends back into a container it is currently inside
//!    fails with [`ObserveError::CircularReference`]. Containers reachable
//!    through several keys (shared, not cyclic) are instrumented once.

use std::collections::HashSet;
use std::rc::Rc;

use crate::container::DataContainer;
use crate::value::Value;

/// Change callback: `(key, new_value, old_value)`.
pub type ChangeCallback = Rc<dyn Fn(&str, &Value, &Value)>;

/// Errors raised while instrumenting a container graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserveError {
    /// The graph reaches a container that is already being observed in the
    /// same pass.
    #[error("circular reference at `{path}`: container is its own ancestor")]
    CircularReference { path: String },
}

/// Instrument every key of `value` (recursively) with `on_change`.
///
/// Non-container values are ignored.
pub fn observe(value: &Value, on_change: &ChangeCallback) -> Result<(), ObserveError> {
    Observation::new().visit_value(value, on_change)
}

/// Convenience wrapper building the callback from a closure.
pub fn observe_with(
    value: &Value,
    on_change: impl Fn(&str, &Value, &Value) + 'static,
) -> Result<(), ObserveError> {
    let callback: ChangeCallback = Rc::new(on_change);
    observe(value, &callback)
}

/// State of a single observation pass.
pub(crate) struct Observation {
    /// Containers currently being descended, outermost first.
    chain: Vec<usize>,
    /// Containers already fully instrumented in this pass.
    done: HashSet<usize>,
    path: Vec<String>,
}

impl Observation {
    pub(crate) fn new() -> Self {
        Self {
            chain: Vec::new(),
            done: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// A pass that starts inside `container`, about to assign `key`.
    pub(crate) fn rooted_at(container: &DataContainer, key: &str) -> Self {
        Self {
            chain: vec![container.id()],
            done: HashSet::new(),
            path: vec![key.to_string()],
        }
    }

    pub(crate) fn visit_value(
        &mut self,
        value: &Value,
        callback: &ChangeCallback,
    ) -> Result<(), ObserveError> {
        match value {
            Value::Map(map) => self.visit(map, callback),
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Map(map) = item {
                        self.path.push(index.to_string());
                        self.visit(map, callback)?;
                        self.path.pop();
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit(&mut self, map: &DataContainer, callback: &ChangeCallback) -> Result<(), ObserveError> {
        let id = map.id();
        if self.chain.contains(&id) {
            return Err(ObserveError::CircularReference {
                path: self.path.join("."),
            });
        }
        if !self.done.insert(id) {
            return Ok(());
        }

        self.chain.push(id);
        for (key, child) in map.instrument(callback) {
            if child.is_container() {
                self.path.push(key);
                self.visit_value(&child, callback)?;
                self.path.pop();
            }
        }
        self.chain.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use std::cell::{Cell, RefCell};

    type Log = Rc<RefCell<Vec<(String, Value, Value)>>>;

    fn recorder() -> (ChangeCallback, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let cb: ChangeCallback = Rc::new(move |key: &str, new: &Value, old: &Value| {
            sink.borrow_mut()
                .push((key.to_string(), new.clone(), old.clone()));
        });
        (cb, log)
    }

    #[test]
    fn tracked_write_notifies_with_new_and_old() {
        let c = data! { "count" => 0 };
        let (cb, log) = recorder();
        observe(&Value::Map(c.clone()), &cb).unwrap();

        c.set("count", 5).unwrap();
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], ("count".into(), Value::from(5), Value::from(0)));
    }

    #[test]
    fn equal_write_is_noop() {
        let c = data! { "count" => 0 };
        let (cb, log) = recorder();
        observe(&Value::Map(c.clone()), &cb).unwrap();

        assert_eq!(c.set("count", 1), Ok(true));
        assert_eq!(c.set("count", 1), Ok(false));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn non_container_is_skipped() {
        let (cb, log) = recorder();
        assert_eq!(observe(&Value::from(3), &cb), Ok(()));
        assert_eq!(observe(&Value::Null, &cb), Ok(()));
        assert_eq!(observe(&Value::Undefined, &cb), Ok(()));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn nested_containers_are_observed() {
        let user = data! { "name" => "Ada" };
        let root = data! { "user" => user.clone() };
        let (cb, log) = recorder();
        observe(&Value::Map(root), &cb).unwrap();

        user.set("name", "Grace").unwrap();
        assert_eq!(log.borrow()[0].0, "name");
        assert_eq!(log.borrow()[0].1, Value::from("Grace"));
    }

    #[test]
    fn newly_assigned_container_is_observed_before_callback() {
        let root = data! { "user" => Value::Null };
        let seen_tracked = Rc::new(Cell::new(false));
        let seen = Rc::clone(&seen_tracked);
        let cb: ChangeCallback = Rc::new(move |_: &str, new: &Value, _: &Value| {
            if let Some(map) = new.as_map() {
                seen.set(map.is_tracked("name"));
            }
        });
        observe(&Value::Map(root.clone()), &cb).unwrap();

        let fresh = data! { "name" => "Linus" };
        root.set("user", fresh.clone()).unwrap();
        assert!(seen_tracked.get(), "nested keys tracked when callback runs");
        assert!(fresh.is_tracked("name"));
    }

    #[test]
    fn maps_inside_lists_are_observed() {
        let item = data! { "done" => false };
        let root = data! { "items" => Value::list([Value::from(item.clone())]) };
        let (cb, log) = recorder();
        observe(&Value::Map(root), &cb).unwrap();

        item.set("done", true).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn reobserve_does_not_double_wrap() {
        let c = data! { "a" => 1 };
        let (cb, log) = recorder();
        observe(&Value::Map(c.clone()), &cb).unwrap();
        observe(&Value::Map(c.clone()), &cb).unwrap();

        c.set("a", 2).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn reobserve_instruments_only_new_keys() {
        let c = data! { "a" => 1 };
        let (first, first_log) = recorder();
        observe(&Value::Map(c.clone()), &first).unwrap();

        c.set("b", 1).unwrap();
        assert!(!c.is_tracked("b"));

        let (second, second_log) = recorder();
        observe(&Value::Map(c.clone()), &second).unwrap();
        c.set("a", 10).unwrap();
        c.set("b", 10).unwrap();
        assert_eq!(first_log.borrow().len(), 1);
        assert_eq!(first_log.borrow()[0].0, "a");
        assert_eq!(second_log.borrow().len(), 1);
        assert_eq!(second_log.borrow()[0].0, "b");
    }

    #[test]
    fn shared_container_is_not_a_cycle() {
        let shared = data! { "v" => 1 };
        let root = data! { "left" => shared.clone(), "right" => shared.clone() };
        let (cb, log) = recorder();
        assert_eq!(observe(&Value::Map(root), &cb), Ok(()));

        shared.set("v", 2).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn existing_cycle_is_reported() {
        let a = DataContainer::new();
        let b = data! { "back" => a.clone() };
        a.set("child", b).unwrap();

        let (cb, _log) = recorder();
        let err = observe(&Value::Map(a), &cb).unwrap_err();
        assert_eq!(
            err,
            ObserveError::CircularReference {
                path: "child.back".into()
            }
        );
    }

    #[test]
    fn cyclic_assignment_is_rejected_and_not_stored() {
        let root = data! { "me" => Value::Null };
        let (cb, log) = recorder();
        observe(&Value::Map(root.clone()), &cb).unwrap();

        let err = root.set("me", root.clone()).unwrap_err();
        assert!(matches!(err, ObserveError::CircularReference { .. }));
        assert_eq!(root.get("me"), Some(Value::Null));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn callback_may_write_reentrantly() {
        let c = data! { "a" => 0, "b" => 0 };
        let handle = c.clone();
        let calls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&calls);
        observe_with(&Value::Map(c.clone()), move |key, new, _| {
            counter.set(counter.get() + 1);
            if key == "a" {
                handle.set("b", new.clone()).unwrap();
            }
        })
        .unwrap();

        c.set("a", 3).unwrap();
        assert_eq!(c.get("b"), Some(Value::from(3)));
        assert_eq!(calls.get(), 2);
    }
}
