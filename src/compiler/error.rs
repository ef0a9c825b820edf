use strum::Display;
use thiserror::Error;

use crate::types::{join_type_names, TypeRef};

pub type CompileResult<T> = Result<T, CompileError>;

/// Which root a compiled expression is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExpressionRole {
    Condition,
    Action,
}

/// Errors raised while turning a literal node into a constant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiteralError {
    #[error("Unrecognized literal kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Unable to parse literal of kind '{kind}' with value '{value}'")]
    InvalidValue { kind: String, value: String },

    #[error("Expected a BasicLiteral, found '{found}'")]
    NotBasicLiteral { found: String },

    #[error("Arrays must have at least one element")]
    EmptyArray,

    #[error("Failed to parse array element at index {index}: {source}")]
    ArrayElement {
        index: usize,
        #[source]
        source: Box<LiteralError>,
    },
}

/// Compile-time failures. Compilation stops at the first one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{message}")]
    Structural { message: String },

    #[error(transparent)]
    LiteralParse(#[from] LiteralError),

    #[error("The binary operator {operator} must have operands of the same type. Operand types used where '{left}' and '{right}'")]
    TypeMismatch {
        operator: String,
        left: TypeRef,
        right: TypeRef,
    },

    #[error("Array elements must all be of the same type. Found '{expected}' and '{found}' at index {index}")]
    ArrayElementMismatch {
        index: usize,
        expected: TypeRef,
        found: TypeRef,
    },

    #[error("{role} expression must be of type '{expected}', but it returns '{found}'")]
    InvalidRootType {
        role: ExpressionRole,
        expected: TypeRef,
        found: TypeRef,
    },

    #[error("The {arity} operator {operator} is not defined for the type '{operand}'")]
    OperatorNotDefined {
        arity: &'static str,
        operator: String,
        operand: TypeRef,
    },

    #[error("Operator '{operator}' is not a supported {arity} operator")]
    UnsupportedOperator {
        arity: &'static str,
        operator: String,
    },

    #[error("{usage} expression '{kind}' is not supported")]
    UnsupportedExpression { usage: &'static str, kind: String },

    #[error("Failed to resolve method '{method}' with arguments: {}", join_type_names(.arguments))]
    Resolution {
        method: String,
        arguments: Vec<TypeRef>,
    },

    #[error("'{segment}' is not a member of '{owner}'")]
    MemberAccess { segment: String, owner: String },

    #[error("Member path '{path}' has object type '{ty}' and can only be used as a call receiver")]
    ObjectValue { path: String, ty: TypeRef },

    #[error("Type of context '{requested}' does not match MethodResolutionOptions '{configured}'")]
    Configuration {
        requested: String,
        configured: String,
    },

    #[error("Method '{method}' mutates the context and cannot be used in a condition")]
    MutationInCondition { method: String },

    #[error("Expression nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize },
}

impl From<serde_json::Error> for CompileError {
    fn from(error: serde_json::Error) -> Self {
        CompileError::structural(error.to_string())
    }
}

impl CompileError {
    pub fn structural<S: Into<String>>(message: S) -> Self {
        CompileError::Structural {
            message: message.into(),
        }
    }

    pub fn type_mismatch(operator: impl ToString, left: TypeRef, right: TypeRef) -> Self {
        CompileError::TypeMismatch {
            operator: operator.to_string(),
            left,
            right,
        }
    }

    pub fn invalid_root(role: ExpressionRole, expected: TypeRef, found: TypeRef) -> Self {
        CompileError::InvalidRootType {
            role,
            expected,
            found,
        }
    }

    pub fn resolution(method: &str, arguments: &[TypeRef]) -> Self {
        CompileError::Resolution {
            method: method.to_string(),
            arguments: arguments.to_vec(),
        }
    }

    pub fn member_access(segment: &str, owner: impl ToString) -> Self {
        CompileError::MemberAccess {
            segment: segment.to_string(),
            owner: owner.to_string(),
        }
    }
}
