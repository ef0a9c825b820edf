//! Rule and expression AST as received on the wire.
//!
//! Nodes are untyped: operators and literal kinds are kept as the raw strings
//! the producer sent, and only acquire meaning in [`crate::compiler`].

pub mod operator;

use serde::{Deserialize, Deserializer, Serialize};

use crate::compiler::CompileResult;

pub use operator::{BinaryOperator, UnaryOperator};

/// Expression node, tagged by `expressionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expressionType")]
pub enum Expression {
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Call(CallExpression),
    MemberAccess(MemberAccessExpression),
    ArrayLiteral(ArrayLiteralExpression),
    BasicLiteral(LiteralExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operator: String,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub operator: String,
    #[serde(rename = "expression")]
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    pub method: MethodRef,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRef {
    pub name: String,
    /// Dotted receiver path; the context itself when absent.
    #[serde(
        rename = "x",
        default,
        deserialize_with = "receiver_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub receiver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccessExpression {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteralExpression {
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpression {
    pub kind: String,
    pub value: String,
}

fn receiver_path<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = Option::<String>::deserialize(deserializer)?;
    Ok(path.filter(|p| !p.trim().is_empty()))
}

impl Expression {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> CompileResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Wire name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Binary(_) => "Binary",
            Expression::Unary(_) => "Unary",
            Expression::Call(_) => "Call",
            Expression::MemberAccess(_) => "MemberAccess",
            Expression::ArrayLiteral(_) => "ArrayLiteral",
            Expression::BasicLiteral(_) => "BasicLiteral",
        }
    }

    pub fn binary(operator: impl Into<String>, left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            operator: operator.into(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(operator: impl Into<String>, operand: Expression) -> Self {
        Expression::Unary(UnaryExpression {
            operator: operator.into(),
            operand: Box::new(operand),
        })
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::Call(CallExpression {
            method: MethodRef {
                name: name.into(),
                receiver: None,
            },
            arguments,
        })
    }

    pub fn call_on(
        receiver: impl Into<String>,
        name: impl Into<String>,
        arguments: Vec<Expression>,
    ) -> Self {
        Expression::Call(CallExpression {
            method: MethodRef {
                name: name.into(),
                receiver: Some(receiver.into()),
            },
            arguments,
        })
    }

    pub fn member(path: impl Into<String>) -> Self {
        Expression::MemberAccess(MemberAccessExpression { path: path.into() })
    }

    pub fn array(elements: Vec<Expression>) -> Self {
        Expression::ArrayLiteral(ArrayLiteralExpression { elements })
    }

    pub fn literal(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Expression::BasicLiteral(LiteralExpression {
            kind: kind.into(),
            value: value.into(),
        })
    }

    pub fn int(value: i32) -> Self {
        Self::literal("INT", value.to_string())
    }

    pub fn bool(value: bool) -> Self {
        Self::literal("BOOL", value.to_string())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal("STRING", value)
    }

    pub fn decimal(value: impl Into<String>) -> Self {
        Self::literal("DECIMAL", value)
    }
}

/// A rule as decoded from the wire.
///
/// `condition` and `actions` stay optional here so that their absence is
/// reported by the rule compiler as a structural error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Expression>>,
}

impl Rule {
    pub fn new(name: impl Into<String>, condition: Expression, actions: Vec<Expression>) -> Self {
        Self {
            name: Some(name.into()),
            condition: Some(condition),
            actions: Some(actions),
        }
    }

    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> CompileResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
