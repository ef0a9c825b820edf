//! Executable artifacts produced by the compiler.

pub mod compiled;
pub mod evaluator;

pub use compiled::{CompiledAction, CompiledCondition, CompiledRule};
pub use evaluator::{Eval, EvalError, EvalResult, Frame};
