#![forbid(unsafe_code)]

//! Insertion-ordered, shared key/value container with per-key accessors.
//!
//! # Design
//!
//! A [`DataContainer`] is a cloneable handle to shared storage
//! (`Rc<RefCell<..>>`); clones see the same entries. Each entry is a slot
//! holding the current value and, once the key has been observed, an
//! *accessor*: the change callback installed by
//! [`observe`](crate::observer::observe).
//!
//! [`DataContainer::set`] is the only write path. For a tracked key it
//! compares the new value with the old one ([`Value::same_value`]); equal
//! writes are no-ops, distinct writes replace the value, observe any new
//! nested container, and then run the callback exactly once before
//! returning.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Write to untracked key | Key added after the last `observe` pass | Stored, no callback |
//! | Cyclic assignment | New value reaches this container | `ObserveError`, nothing stored |
//! | Re-entrant write | Callback writes to the same container | Allowed, no borrow is held |
//!
//! There is no way to mutate a tracked slot without going through its
//! accessor; code that needs reactivity must write through `set`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::observer::{ChangeCallback, ObserveError, Observation};
use crate::value::Value;

struct Slot {
    value: Value,
    accessor: Option<ChangeCallback>,
}

#[derive(Default)]
struct ContainerInner {
    entries: IndexMap<String, Slot>,
}

/// Shared, insertion-ordered mapping from key to [`Value`].
///
/// Cloning a `DataContainer` creates a new handle to the **same** storage.
#[derive(Clone, Default)]
pub struct DataContainer {
    inner: Rc<RefCell<ContainerInner>>,
}

impl DataContainer {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from `(key, value)` pairs in iteration order.
    ///
    /// Keys are untracked until the container is observed. A repeated key
    /// keeps its first position and takes the last value.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut inner = ContainerInner::default();
        for (key, value) in entries {
            inner.entries.insert(
                key.into(),
                Slot {
                    value: value.into(),
                    accessor: None,
                },
            );
        }
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Read the current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().entries.get(key).map(|slot| slot.value.clone())
    }

    /// Write `value` to `key`.
    ///
    /// Returns `Ok(true)` when the stored value changed (or the key was
    /// added) and `Ok(false)` when the write was a no-op.
    ///
    /// For a tracked key the change callback runs synchronously, after the
    /// value has been replaced and any nested container observed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<bool, ObserveError> {
        let value = value.into();
        let accessor = {
            let inner = self.inner.borrow();
            match inner.entries.get(key) {
                Some(slot) if slot.value.same_value(&value) => return Ok(false),
                Some(slot) => slot.accessor.clone(),
                None => None,
            }
        };

        if let Some(callback) = &accessor {
            // Instrument the incoming graph before committing so a cyclic
            // assignment leaves the container untouched.
            Observation::rooted_at(self, key).visit_value(&value, callback)?;
        }

        let old = {
            let mut inner = self.inner.borrow_mut();
            match inner.entries.get_mut(key) {
                Some(slot) => std::mem::replace(&mut slot.value, value.clone()),
                None => {
                    inner.entries.insert(
                        key.to_string(),
                        Slot {
                            value: value.clone(),
                            accessor: None,
                        },
                    );
                    Value::Undefined
                }
            }
        };

        if let Some(callback) = accessor {
            tracing::trace!(key, from = old.type_name(), to = value.type_name(), "tracked write");
            callback(key, &value, &old);
        }
        Ok(true)
    }

    /// Make `key` a tracked entry holding `value`, instrumenting the value
    /// with `on_change`.
    ///
    /// An already-tracked key is written through [`set`](Self::set). For an
    /// absent or untracked key the value is stored and the accessor
    /// installed without running the callback. A cyclic `value` is rejected
    /// and nothing is stored.
    pub fn insert_tracked(
        &self,
        key: &str,
        value: impl Into<Value>,
        on_change: &ChangeCallback,
    ) -> Result<bool, ObserveError> {
        if self.is_tracked(key) {
            return self.set(key, value);
        }
        let value = value.into();
        Observation::rooted_at(self, key).visit_value(&value, on_change)?;
        let mut inner = self.inner.borrow_mut();
        match inner.entries.get_mut(key) {
            Some(slot) => {
                slot.value = value;
                slot.accessor = Some(Rc::clone(on_change));
            }
            None => {
                inner.entries.insert(
                    key.to_string(),
                    Slot {
                        value,
                        accessor: Some(Rc::clone(on_change)),
                    },
                );
            }
        }
        Ok(true)
    }

    /// Remove `key`, returning its value. Removal does not notify.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner
            .borrow_mut()
            .entries
            .shift_remove(key)
            .map(|slot| slot.value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Whether `key` has an accessor installed.
    #[must_use]
    pub fn is_tracked(&self, key: &str) -> bool {
        self.inner
            .borrow()
            .entries
            .get(key)
            .is_some_and(|slot| slot.accessor.is_some())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Snapshot of `(key, value)` pairs in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    /// Whether both handles point at the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &DataContainer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity of the underlying storage, for visited sets.
    #[must_use]
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    /// Install `callback` on every untracked key and return the values of
    /// all entries so the caller can descend into them.
    ///
    /// Already-tracked keys keep their accessor (no double wrapping).
    pub(crate) fn instrument(&self, callback: &ChangeCallback) -> Vec<(String, Value)> {
        let mut inner = self.inner.borrow_mut();
        inner
            .entries
            .iter_mut()
            .map(|(key, slot)| {
                if slot.accessor.is_none() {
                    slot.accessor = Some(Rc::clone(callback));
                }
                (key.clone(), slot.value.clone())
            })
            .collect()
    }

    /// Drop every accessor in this container and, transitively, in every
    /// nested container. Values are kept.
    pub fn detach(&self) {
        let mut seen = Vec::new();
        self.detach_inner(&mut seen);
    }

    fn detach_inner(&self, seen: &mut Vec<usize>) {
        if seen.contains(&self.id()) {
            return;
        }
        seen.push(self.id());
        let children: Vec<Value> = {
            let mut inner = self.inner.borrow_mut();
            inner
                .entries
                .values_mut()
                .map(|slot| {
                    slot.accessor = None;
                    slot.value.clone()
                })
                .collect()
        };
        for child in children {
            for_each_map(&child, &mut |map| map.detach_inner(seen));
        }
    }
}

/// Run `f` on `value` if it is a map, or on every map directly inside it
/// if it is a list.
pub(crate) fn for_each_map(value: &Value, f: &mut dyn FnMut(&DataContainer)) {
    match value {
        Value::Map(map) => f(map),
        Value::List(items) => {
            for item in items.iter() {
                if let Value::Map(map) = item {
                    f(map);
                }
            }
        }
        _ => {}
    }
}

impl fmt::Debug for DataContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let tracked = inner
            .entries
            .values()
            .filter(|slot| slot.accessor.is_some())
            .count();
        f.debug_struct("DataContainer")
            .field("keys", &inner.entries.keys().collect::<Vec<_>>())
            .field("tracked", &tracked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::observer::observe;
    use std::cell::Cell;

    #[test]
    fn insertion_order_is_kept() {
        let c = data! { "b" => 1, "a" => 2, "c" => 3 };
        assert_eq!(c.keys(), vec!["b", "a", "c"]);
        c.set("d", 4).unwrap();
        c.remove("a");
        assert_eq!(c.keys(), vec!["b", "c", "d"]);
    }

    #[test]
    fn untracked_write_stores_without_callback() {
        let c = data! { "x" => 1 };
        assert_eq!(c.set("x", 2), Ok(true));
        assert_eq!(c.set("x", 2), Ok(false));
        assert_eq!(c.get("x"), Some(Value::from(2)));
        assert!(!c.is_tracked("x"));
    }

    #[test]
    fn insert_tracked_adds_accessor_without_notifying() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let cb: ChangeCallback = Rc::new(move |_: &str, _: &Value, _: &Value| counter.set(counter.get() + 1));

        let c = DataContainer::new();
        let nested = data! { "inner" => 1 };
        assert_eq!(c.insert_tracked("n", nested.clone(), &cb), Ok(true));
        assert_eq!(hits.get(), 0);
        assert!(c.is_tracked("n"));
        assert!(nested.is_tracked("inner"));

        nested.set("inner", 2).unwrap();
        c.set("n", 5).unwrap();
        assert_eq!(hits.get(), 2);

        // Tracked key goes through the accessor.
        assert_eq!(c.insert_tracked("n", 6, &cb), Ok(true));
        assert_eq!(hits.get(), 3);

        // Untracked key is adopted silently.
        c.set("plain", 1).unwrap();
        assert_eq!(c.insert_tracked("plain", 2, &cb), Ok(true));
        assert_eq!(hits.get(), 3);
        assert!(c.is_tracked("plain"));
        assert_eq!(c.get("plain"), Some(Value::from(2)));
    }

    #[test]
    fn insert_tracked_rejects_cycles() {
        let cb: ChangeCallback = Rc::new(|_: &str, _: &Value, _: &Value| {});
        let c = DataContainer::new();
        let err = c.insert_tracked("me", c.clone(), &cb).unwrap_err();
        assert_eq!(
            err,
            ObserveError::CircularReference { path: "me".into() }
        );
        assert!(!c.contains_key("me"));
    }

    #[test]
    fn clone_shares_storage() {
        let a = data! { "n" => 0 };
        let b = a.clone();
        b.set("n", 7).unwrap();
        assert_eq!(a.get("n"), Some(Value::from(7)));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&DataContainer::new()));
    }

    #[test]
    fn detach_removes_nested_accessors() {
        let inner = data! { "name" => "Ada" };
        let root = data! { "user" => inner.clone(), "n" => 1 };
        let fired = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&fired);
        let cb: ChangeCallback = Rc::new(move |_: &str, _: &Value, _: &Value| f.set(f.get() + 1));
        observe(&Value::Map(root.clone()), &cb).unwrap();
        assert!(inner.is_tracked("name"));

        root.detach();
        assert!(!root.is_tracked("n"));
        assert!(!inner.is_tracked("name"));

        root.set("n", 2).unwrap();
        inner.set("name", "Grace").unwrap();
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn debug_lists_keys_only() {
        let c = data! { "a" => 1 };
        let dbg = format!("{c:?}");
        assert!(dbg.contains("DataContainer"));
        assert!(dbg.contains("\"a\""));
        assert!(dbg.contains("tracked: 0"));
    }
}
