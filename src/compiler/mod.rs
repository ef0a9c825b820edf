//! Rule compilation: literals, method resolution, expressions and rules.

pub mod error;
pub mod expression;
pub mod literal;
pub mod operators;
pub mod resolver;
pub mod rule;

pub use error::{CompileError, CompileResult, ExpressionRole, LiteralError};
pub use expression::{ExpressionCompiler, TypedExpr};
pub use literal::{LiteralCompiler, LiteralParser};
pub use resolver::{MethodResolutionOptions, MethodResolver, ResolvedMethod};
pub use rule::RuleCompiler;
