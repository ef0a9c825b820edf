//! Typing and evaluation rules of the operator allow-list.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::eval::{EvalError, EvalResult};
use crate::types::{TypeRef, Value};

use super::error::{CompileError, CompileResult};

impl BinaryOperator {
    /// Result type for two operands of type `operand`.
    pub fn result_type(&self, operand: &TypeRef) -> CompileResult<TypeRef> {
        let defined = match self {
            BinaryOperator::AddChecked
            | BinaryOperator::SubtractChecked
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual => {
                matches!(operand, TypeRef::Int | TypeRef::Decimal)
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => matches!(
                operand,
                TypeRef::Bool | TypeRef::Int | TypeRef::Decimal | TypeRef::String
            ),
            BinaryOperator::AndAlso | BinaryOperator::OrElse => *operand == TypeRef::Bool,
        };
        if !defined {
            return Err(CompileError::OperatorNotDefined {
                arity: "binary",
                operator: self.to_string(),
                operand: operand.clone(),
            });
        }
        Ok(if self.is_arithmetic() {
            operand.clone()
        } else {
            TypeRef::Bool
        })
    }

    /// Eager application. `AndAlso`/`OrElse` are short-circuited by the
    /// expression compiler and only reach here when both sides are known.
    pub fn apply(&self, left: Value, right: Value) -> EvalResult<Value> {
        match self {
            BinaryOperator::AddChecked | BinaryOperator::SubtractChecked => {
                self.arithmetic(left, right)
            }
            BinaryOperator::Equal => Ok(Value::Bool(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOperator::AndAlso | BinaryOperator::OrElse => {
                let (l, r) = (as_bool(&left)?, as_bool(&right)?);
                Ok(Value::Bool(match self {
                    BinaryOperator::AndAlso => l && r,
                    _ => l || r,
                }))
            }
            BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual => {
                let ordering = compare(&left, &right)?;
                Ok(Value::Bool(match self {
                    BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                    BinaryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                    BinaryOperator::LessThan => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }))
            }
        }
    }

    fn arithmetic(&self, left: Value, right: Value) -> EvalResult<Value> {
        let add = *self == BinaryOperator::AddChecked;
        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                let sum = if add { a.checked_add(*b) } else { a.checked_sub(*b) };
                sum.map(Value::Int)
            }
            (Value::Decimal(a), Value::Decimal(b)) => {
                let sum = if add { a.checked_add(*b) } else { a.checked_sub(*b) };
                sum.map(Value::Decimal)
            }
            _ => return Err(EvalError::unexpected(left.type_ref(), &right)),
        };
        result.ok_or_else(|| EvalError::ArithmeticOverflow {
            operator: self.symbol().to_string(),
            left,
            right,
        })
    }
}

impl UnaryOperator {
    pub fn result_type(&self, operand: &TypeRef) -> CompileResult<TypeRef> {
        match (self, operand) {
            (UnaryOperator::Not, TypeRef::Bool) => Ok(TypeRef::Bool),
            (UnaryOperator::Not, _) => Err(CompileError::OperatorNotDefined {
                arity: "unary",
                operator: self.to_string(),
                operand: operand.clone(),
            }),
        }
    }

    pub fn apply(&self, operand: Value) -> EvalResult<Value> {
        match self {
            UnaryOperator::Not => Ok(Value::Bool(!as_bool(&operand)?)),
        }
    }
}

pub(crate) fn as_bool(value: &Value) -> EvalResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| EvalError::unexpected(TypeRef::Bool, value))
}

fn compare(left: &Value, right: &Value) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError::unexpected(left.type_ref(), right)),
    }
}
