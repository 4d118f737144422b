#![forbid(unsafe_code)]

//! Core data model for Vellum.
//!
//! - [`Value`]: dynamically typed values (primitives, shared lists, maps).
//! - [`DataContainer`]: shared, insertion-ordered map whose keys can carry
//!   change accessors.
//! - [`observer`]: the property observer that installs those accessors
//!   recursively and guards against cyclic graphs.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc<RefCell<..>>`). Writes go through
//! [`DataContainer::set`], which is the accessor: it compares, replaces,
//! observes nested containers and finally runs the change callback, all
//! before returning to the caller.
//!
//! # Invariants
//!
//! 1. A write of a value equal to the current one (see
//!    [`Value::same_value`]) is a no-op and never notifies.
//! 2. A distinct-value write to a tracked key notifies exactly once.
//! 3. Nested containers are instrumented before the callback sees them.
//! 4. No container borrow is held while a callback runs.

pub mod container;
pub mod observer;
pub mod value;

pub use container::DataContainer;
pub use observer::{ChangeCallback, ObserveError, observe, observe_with};
pub use value::{Value, format_number};

/// Build a [`DataContainer`] from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use vellum_core::{data, Value};
///
/// let state = data! { "count" => 0, "user" => data! { "name" => "Ada" } };
/// assert_eq!(state.get("count"), Some(Value::from(0)));
/// assert_eq!(state.keys(), vec!["count", "user"]);
/// ```
#[macro_export]
macro_rules! data {
    () => {
        $crate::DataContainer::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::DataContainer::from_entries([
            $(($key, $crate::Value::from($value))),+
        ])
    };
}
