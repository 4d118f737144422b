//! Evaluation of parsed expressions against a [`Scope`].

use std::cmp::Ordering;
use std::collections::HashMap;

use vellum_core::{DataContainer, Value};

use crate::error::EvalError;
use crate::parser::{BinaryOp, Expr, LogicalOp, UnaryOp};

/// Name lookup for bare identifiers.
pub trait Scope {
    /// Value bound to `name`, or `None` when the name is not defined.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for DataContainer {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl Scope for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Adapter turning a lookup closure into a [`Scope`].
pub struct FnScope<F>(pub F);

impl<F> Scope for FnScope<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        (self.0)(name)
    }
}

/// Evaluate `expr` with identifiers resolved through `scope`.
pub fn evaluate(expr: &Expr, scope: &dyn Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownIdentifier { name: name.clone() }),
        Expr::Member { object, property } => {
            let object = evaluate(object, scope)?;
            member(&object, property)
        }
        Expr::Index { object, index } => {
            let object = evaluate(object, scope)?;
            let index = evaluate(index, scope)?;
            element(&object, &index)
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
            })
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, scope)?;
            match (op, left.is_truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => evaluate(right, scope),
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.is_truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
    }
}

fn member(object: &Value, property: &str) -> Result<Value, EvalError> {
    match object {
        Value::Undefined | Value::Null => Err(EvalError::NullAccess {
            property: property.to_string(),
            target: object.type_name(),
        }),
        Value::Map(map) => Ok(map.get(property).unwrap_or_default()),
        Value::List(items) if property == "length" => Ok(Value::from(items.len())),
        Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Undefined),
    }
}

fn element(object: &Value, index: &Value) -> Result<Value, EvalError> {
    match object {
        Value::Undefined | Value::Null => Err(EvalError::NullAccess {
            property: index.to_string(),
            target: object.type_name(),
        }),
        Value::List(items) => Ok(as_index(index)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::String(s) => Ok(as_index(index)
            .and_then(|i| s.chars().nth(i))
            .map_or(Value::Undefined, |c| Value::String(c.to_string()))),
        _ => member(object, &index.to_string()),
    }
}

fn as_index(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => *n,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    (n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64).then_some(n as usize)
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if is_stringy(left) || is_stringy(right) {
                Value::String(format!("{left}{right}"))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::StrictEq => Value::Bool(left.same_value(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.same_value(right)),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// Operands that turn `+` into concatenation.
fn is_stringy(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::List(_) | Value::Map(_))
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (a, b) if a.is_nullish() && b.is_nullish() => true,
        (a, b) if a.is_nullish() || b.is_nullish() => false,
        (Value::Number(_) | Value::String(_) | Value::Bool(_), Value::Number(_) | Value::String(_) | Value::Bool(_))
            if std::mem::discriminant(left) != std::mem::discriminant(right) =>
        {
            left.to_number() == right.to_number()
        }
        _ => left.same_value(right),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}
