//! Component errors.

use thiserror::Error;
use vellum_core::ObserveError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// Any operation on a component after [`destroy`](crate::Component::destroy).
    #[error("component has been destroyed")]
    Destroyed,
    /// The data graph could not be observed.
    #[error(transparent)]
    Observe(#[from] ObserveError),
    /// [`call`](crate::Component::call) named a method that is not registered.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
}

pub type Result<T> = std::result::Result<T, ComponentError>;
