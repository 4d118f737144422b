#![forbid(unsafe_code)]

//! Template compilation for Vellum components.
//!
//! A [`TemplateCompiler`] turns a string such as `"Hello {{ name }}"` into
//! a cached [`CompiledTemplate`] that renders against any
//! [`Scope`](vellum_expr::Scope).
//!
//! # Example
//!
//! ```
//! use vellum_core::data;
//! use vellum_template::TemplateCompiler;
//!
//! let compiler = TemplateCompiler::new();
//! let scope = data! { "name" => "<Ada>", "n" => 2 };
//! assert_eq!(
//!     compiler.render("Hi {{ name }} x{{ n * 2 }}", &scope),
//!     "Hi &lt;Ada&gt; x4"
//! );
//! assert_eq!(compiler.compile_count(), 1);
//! ```
//!
//! # Feature Flags
//!
//! - `config-file`: load [`CompilerConfig`] from TOML.

pub mod compiler;
pub mod config;
pub mod error;

pub use compiler::{CompiledTemplate, Interpolation, TemplateCompiler, Token};
pub use config::CompilerConfig;
pub use error::TemplateError;
