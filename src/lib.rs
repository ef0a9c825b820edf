//! # kettei
//!
//! Compiles JSON-encoded business rules into typed predicates and procedures
//! bound to an application "context" type.
//!
//! A rule is a boolean condition plus an ordered list of void actions:
//!
//! ```json
//! {
//!   "name": "Furnace tune-up",
//!   "condition": { "expressionType": "Call", "method": { "name": "IsInPreWinterSeason" }, "arguments": [] },
//!   "actions": [
//!     { "expressionType": "Call", "method": { "name": "CreateWorkOrder" },
//!       "arguments": [{ "expressionType": "BasicLiteral", "kind": "STRING", "value": "Furnace Tune-Up" }] }
//!   ]
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`ast`] decodes the wire shape into an untyped [`Expression`] tree.
//! 2. [`compiler::ExpressionCompiler`] type-checks each tree against the members
//!    and methods a [`TypeCatalog`] declares for the context type, resolving
//!    calls through [`compiler::MethodResolver`] and constants through
//!    [`compiler::LiteralCompiler`].
//! 3. [`compiler::RuleCompiler`] packages the condition and actions into a
//!    [`CompiledRule`] that can be evaluated any number of times, from any
//!    thread, against distinct context instances.
//!
//! The [`metadata`] module describes context types for tooling and is
//! independent of compilation.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod eval;
pub mod metadata;
pub mod types;

// Re-exports
pub use ast::{Expression, Rule};
pub use compiler::{
    CompileError, CompileResult, ExpressionCompiler, MethodResolutionOptions, RuleCompiler,
};
pub use config::CompilerConfig;
pub use error::*;
pub use eval::{CompiledAction, CompiledCondition, CompiledRule, EvalError, EvalResult};
pub use types::{
    Arguments, Context, HostType, ObjectType, TypeCatalog, TypeRef, TypeRegistry, Value,
};
