//! Literal Compiler: typed constants from `BasicLiteral` and `ArrayLiteral` nodes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lazy_static::lazy_static;
use rust_decimal::Decimal;

use crate::ast::{ArrayLiteralExpression, CallExpression, Expression, LiteralExpression};
use crate::types::{TypeRef, Value};

use super::error::{CompileError, CompileResult, LiteralError};

/// Parser for one literal kind.
pub trait LiteralParser: Send + Sync {
    fn kind(&self) -> &str;
    fn value_type(&self) -> TypeRef;
    fn try_parse(&self, text: &str) -> Option<Value>;
}

struct BoolParser;

impl LiteralParser for BoolParser {
    fn kind(&self) -> &str {
        "BOOL"
    }

    fn value_type(&self) -> TypeRef {
        TypeRef::Bool
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Some(Value::Bool(false))
        } else {
            None
        }
    }
}

struct IntParser;

impl LiteralParser for IntParser {
    fn kind(&self) -> &str {
        "INT"
    }

    fn value_type(&self) -> TypeRef {
        TypeRef::Int
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        i32::from_str(text.trim()).ok().map(Value::Int)
    }
}

struct DecimalParser;

impl LiteralParser for DecimalParser {
    fn kind(&self) -> &str {
        "DECIMAL"
    }

    fn value_type(&self) -> TypeRef {
        TypeRef::Decimal
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        Decimal::from_str(text.trim()).ok().map(Value::Decimal)
    }
}

struct StringParser;

impl LiteralParser for StringParser {
    fn kind(&self) -> &str {
        "STRING"
    }

    fn value_type(&self) -> TypeRef {
        TypeRef::String
    }

    fn try_parse(&self, text: &str) -> Option<Value> {
        Some(Value::String(text.to_string()))
    }
}

lazy_static! {
    static ref BUILTIN_PARSERS: Vec<Arc<dyn LiteralParser>> = vec![
        Arc::new(BoolParser),
        Arc::new(IntParser),
        Arc::new(DecimalParser),
        Arc::new(StringParser),
    ];
}

/// Dispatches literal nodes to the parser registered for their kind.
#[derive(Clone)]
pub struct LiteralCompiler {
    parsers: HashMap<String, Arc<dyn LiteralParser>>,
}

impl Default for LiteralCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LiteralCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.parsers.keys().collect();
        kinds.sort();
        f.debug_struct("LiteralCompiler")
            .field("kinds", &kinds)
            .finish()
    }
}

impl LiteralCompiler {
    pub fn new() -> Self {
        Self {
            parsers: BUILTIN_PARSERS
                .iter()
                .map(|parser| (parser.kind().to_string(), parser.clone()))
                .collect(),
        }
    }

    /// Registers an additional kind, replacing any parser with the same name.
    pub fn with_parser(mut self, parser: Arc<dyn LiteralParser>) -> Self {
        self.parsers.insert(parser.kind().to_string(), parser);
        self
    }

    pub fn parse_literal(
        &self,
        literal: &LiteralExpression,
    ) -> Result<(Value, TypeRef), LiteralError> {
        let parser = self
            .parsers
            .get(&literal.kind)
            .ok_or_else(|| LiteralError::UnknownKind {
                kind: literal.kind.clone(),
            })?;
        let value = parser
            .try_parse(&literal.value)
            .ok_or_else(|| LiteralError::InvalidValue {
                kind: literal.kind.clone(),
                value: literal.value.clone(),
            })?;
        Ok((value, parser.value_type()))
    }

    /// Parses a homogeneous, non-empty array. Returns the array and its element type.
    pub fn parse_array_literal(
        &self,
        array: &ArrayLiteralExpression,
    ) -> CompileResult<(Value, TypeRef)> {
        let mut element_type: Option<TypeRef> = None;
        let mut items = Vec::with_capacity(array.elements.len());

        for element in &array.elements {
            // position of the element == number of elements parsed so far
            let index = items.len();
            let Expression::BasicLiteral(literal) = element else {
                return Err(LiteralError::ArrayElement {
                    index,
                    source: Box::new(LiteralError::NotBasicLiteral {
                        found: element.kind().to_string(),
                    }),
                }
                .into());
            };
            let (value, ty) = self
                .parse_literal(literal)
                .map_err(|source| LiteralError::ArrayElement {
                    index,
                    source: Box::new(source),
                })?;
            match &element_type {
                None => element_type = Some(ty),
                Some(expected) if *expected != ty => {
                    return Err(CompileError::ArrayElementMismatch {
                        index,
                        expected: expected.clone(),
                        found: ty,
                    });
                }
                Some(_) => {}
            }
            items.push(value);
        }

        let element = element_type.ok_or(LiteralError::EmptyArray)?;
        Ok((
            Value::Array {
                element: element.clone(),
                items,
            },
            element,
        ))
    }

    /// Parses the arguments of a call in source order. Returns each value
    /// with its static type (`T[]` for array arguments).
    pub fn parse_argument_list(
        &self,
        call: &CallExpression,
    ) -> CompileResult<Vec<(Value, TypeRef)>> {
        call.arguments
            .iter()
            .map(|argument| -> CompileResult<(Value, TypeRef)> {
                match argument {
                    Expression::BasicLiteral(literal) => Ok(self.parse_literal(literal)?),
                    Expression::ArrayLiteral(array) => {
                        let (value, element) = self.parse_array_literal(array)?;
                        Ok((value, TypeRef::array(element)))
                    }
                    other => Err(CompileError::UnsupportedExpression {
                        usage: "Argument",
                        kind: other.kind().to_string(),
                    }),
                }
            })
            .collect()
    }
}
