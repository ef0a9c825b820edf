use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{TypeRef, Value};

pub type EvalResult<T> = Result<T, EvalError>;

/// Failures a well-typed tree can still hit at evaluation time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Arithmetic overflow evaluating {left} {operator} {right}")]
    ArithmeticOverflow {
        operator: String,
        left: Value,
        right: Value,
    },

    #[error("Receiver is not a '{expected}'")]
    ReceiverMismatch { expected: String },

    #[error("Method '{method}' is missing argument {index}")]
    MissingArgument { method: String, index: usize },

    #[error("Method '{method}' argument {index}: expected {expected}, found {found}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: TypeRef,
        found: TypeRef,
    },

    #[error("Method '{method}' mutates the context and cannot run during condition evaluation")]
    MutationDenied { method: String },

    #[error("Member '{member}' of '{owner}' has no value")]
    MissingObject { owner: String, member: String },

    #[error("Unexpected value: expected {expected}, found {found}")]
    UnexpectedValue { expected: TypeRef, found: TypeRef },

    #[error("Host method failed: {0}")]
    Host(String),
}

impl EvalError {
    pub fn host<S: Into<String>>(message: S) -> Self {
        EvalError::Host(message.into())
    }

    pub fn unexpected(expected: TypeRef, found: &Value) -> Self {
        EvalError::UnexpectedValue {
            expected,
            found: found.type_ref(),
        }
    }
}

/// The context a compiled tree runs against.
///
/// Conditions run against a shared borrow, actions against an exclusive one.
pub enum Frame<'a> {
    Shared(&'a dyn Any),
    Exclusive(&'a mut dyn Any),
}

impl Frame<'_> {
    pub fn shared(&self) -> &dyn Any {
        match self {
            Frame::Shared(context) => *context,
            Frame::Exclusive(context) => &**context,
        }
    }

    pub fn exclusive(&mut self, method: &str) -> EvalResult<&mut dyn Any> {
        match self {
            Frame::Exclusive(context) => Ok(&mut **context),
            Frame::Shared(_) => Err(EvalError::MutationDenied {
                method: method.to_string(),
            }),
        }
    }
}

/// A compiled expression node.
pub type Eval = Arc<dyn Fn(&mut Frame<'_>) -> EvalResult<Value> + Send + Sync>;

pub(crate) fn node<F>(f: F) -> Eval
where
    F: Fn(&mut Frame<'_>) -> EvalResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}
