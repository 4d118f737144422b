#![forbid(unsafe_code)]

//! Reactive components for Vellum.
//!
//! A [`Component`] owns a [`DataContainer`](vellum_core::DataContainer)
//! whose keys are observed. Every tracked write dispatches the key's
//! watchers and then re-renders the component's template into its
//! [`RenderTarget`], synchronously. [`Component::next_tick`] defers work
//! to a [`TaskQueue`] that the host drains after the synchronous phase.
//!
//! # Example
//!
//! ```
//! use vellum_core::data;
//! use vellum_runtime::{ComponentOptions, SharedTarget, TaskQueue};
//!
//! let target = SharedTarget::new();
//! let queue = TaskQueue::new();
//! let counter = ComponentOptions::new()
//!     .data(data! { "count" => 0 })
//!     .template("Count: {{count}}")
//!     .target(target.clone())
//!     .task_queue(queue.clone())
//!     .build()
//!     .unwrap();
//!
//! counter.set("count", 5).unwrap();
//! assert_eq!(target.content(), "Count: 5");
//!
//! let seen = target.clone();
//! let tick = counter.next_tick(move || seen.content()).unwrap();
//! queue.run_until_idle();
//! assert_eq!(tick.try_take().as_deref(), Some("Count: 5"));
//! ```
//!
//! # Threading
//!
//! Components are single-threaded (`Rc`/`RefCell`) and not `Send`.

pub mod component;
pub mod error;
pub mod events;
pub mod options;
pub mod target;
pub mod tick;

pub use component::{Component, shared_compiler};
pub use error::{ComponentError, Result};
pub use events::{DATA_CHANGE, DataChange, EventEmitter, ListenerId, Unwatch};
pub use options::{ComponentOptions, ComputedFn, Hook, HookFn, MethodFn, WatchFn};
pub use target::{RenderTarget, SharedTarget};
pub use tick::{NextTick, TaskQueue};
