#![forbid(unsafe_code)]

//! Sandboxed interpolation expressions for Vellum templates.
//!
//! Expressions are tokenized, parsed by recursive descent into an [`Expr`]
//! tree, and evaluated against a [`Scope`] in which every bound name is
//! addressable directly. Nothing is ever handed to a general-purpose code
//! execution facility.
//!
//! Supported syntax: number, string, `true`/`false`/`null`/`undefined`
//! literals, identifiers, `a.b` and `a[i]` access, unary `! - +`,
//! arithmetic `+ - * / %`, comparisons, `== != === !==`, `&& ||` and the
//! `?:` conditional.
//!
//! # Example
//!
//! ```
//! use vellum_core::{data, Value};
//! use vellum_expr::eval_str;
//!
//! let scope = data! { "count" => 4, "user" => data! { "name" => "Ada" } };
//! assert_eq!(eval_str("count * 2", &scope).unwrap(), Value::from(8));
//! assert_eq!(
//!     eval_str("user.name + '!'", &scope).unwrap(),
//!     Value::from("Ada!")
//! );
//! assert!(eval_str("missing", &scope).is_err());
//! ```

pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use error::{EvalError, ExprError, ParseError};
pub use eval::{FnScope, Scope, evaluate};
pub use parser::{Expr, parse};

use vellum_core::Value;

/// Parse and evaluate `src` in one step.
pub fn eval_str(src: &str, scope: &dyn Scope) -> Result<Value, ExprError> {
    let expr = parse(src)?;
    Ok(evaluate(&expr, scope)?)
}
