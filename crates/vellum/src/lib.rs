#![forbid(unsafe_code)]

//! Vellum public facade.
//!
//! Re-exports the member crates and a [`prelude`] with the types most
//! hosts need.
//!
//! ```
//! use vellum::prelude::*;
//!
//! let target = SharedTarget::new();
//! let greeting = ComponentOptions::new()
//!     .data(data! { "name" => "world" })
//!     .template("Hello, {{ name }}!")
//!     .target(target.clone())
//!     .build()
//!     .unwrap();
//!
//! greeting.set("name", "Vellum").unwrap();
//! assert_eq!(target.content(), "Hello, Vellum!");
//! ```
//!
//! # Feature Flags
//!
//! - `runtime` (default): components, watchers, `next_tick`.
//! - `config-file`: TOML-loadable [`CompilerConfig`](vellum_template::CompilerConfig).
//! - `serde`: build [`Value`](vellum_core::Value)s from `serde_json::Value`.

pub use vellum_core;
pub use vellum_expr;
#[cfg(feature = "runtime")]
pub use vellum_runtime;
pub use vellum_template;

pub use vellum_core::data;

pub mod prelude {
    pub use vellum_core::{DataContainer, Value, data};
    pub use vellum_expr::Scope;
    pub use vellum_template::{CompilerConfig, TemplateCompiler};

    #[cfg(feature = "runtime")]
    pub use vellum_runtime::{
        Component, ComponentError, ComponentOptions, DataChange, Hook, NextTick, RenderTarget,
        SharedTarget, TaskQueue, Unwatch,
    };
}
