use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use tracing::trace;

use super::evaluator::{Eval, EvalError, EvalResult, Frame};
use crate::types::{Context, ObjectType, TypeRef, Value};

/// A boolean predicate compiled against the context type `C`.
pub struct CompiledCondition<C> {
    context_type: ObjectType,
    expression: String,
    compile_time: Duration,
    eval: Eval,
    _context: PhantomData<fn(&C)>,
}

impl<C: Context> CompiledCondition<C> {
    pub(crate) fn new(expression: String, compile_time: Duration, eval: Eval) -> Self {
        Self {
            context_type: ObjectType::of::<C>(),
            expression,
            compile_time,
            eval,
            _context: PhantomData,
        }
    }

    pub fn evaluate(&self, context: &C) -> EvalResult<bool> {
        let mut frame = Frame::Shared(context);
        match (self.eval)(&mut frame)? {
            Value::Bool(result) => Ok(result),
            other => Err(EvalError::unexpected(TypeRef::Bool, &other)),
        }
    }
}

impl<C> CompiledCondition<C> {
    pub fn context_type(&self) -> &ObjectType {
        &self.context_type
    }

    /// Rendering of the compiled tree, e.g. `ctx => (1 < 2)`.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn compile_time(&self) -> Duration {
        self.compile_time
    }
}

impl<C> Clone for CompiledCondition<C> {
    fn clone(&self) -> Self {
        Self {
            context_type: self.context_type.clone(),
            expression: self.expression.clone(),
            compile_time: self.compile_time,
            eval: self.eval.clone(),
            _context: PhantomData,
        }
    }
}

impl<C> fmt::Display for CompiledCondition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        diagnostic(f, &self.context_type, &self.expression, self.compile_time)
    }
}

impl<C> fmt::Debug for CompiledCondition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledCondition({})", self)
    }
}

/// A void procedure compiled against the context type `C`.
pub struct CompiledAction<C> {
    context_type: ObjectType,
    expression: String,
    compile_time: Duration,
    eval: Eval,
    _context: PhantomData<fn(&mut C)>,
}

impl<C: Context> CompiledAction<C> {
    pub(crate) fn new(expression: String, compile_time: Duration, eval: Eval) -> Self {
        Self {
            context_type: ObjectType::of::<C>(),
            expression,
            compile_time,
            eval,
            _context: PhantomData,
        }
    }

    pub fn execute(&self, context: &mut C) -> EvalResult<()> {
        let mut frame = Frame::Exclusive(context);
        match (self.eval)(&mut frame)? {
            Value::Unit => Ok(()),
            other => Err(EvalError::unexpected(TypeRef::Void, &other)),
        }
    }
}

impl<C> CompiledAction<C> {
    pub fn context_type(&self) -> &ObjectType {
        &self.context_type
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn compile_time(&self) -> Duration {
        self.compile_time
    }
}

impl<C> Clone for CompiledAction<C> {
    fn clone(&self) -> Self {
        Self {
            context_type: self.context_type.clone(),
            expression: self.expression.clone(),
            compile_time: self.compile_time,
            eval: self.eval.clone(),
            _context: PhantomData,
        }
    }
}

impl<C> fmt::Display for CompiledAction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        diagnostic(f, &self.context_type, &self.expression, self.compile_time)
    }
}

impl<C> fmt::Debug for CompiledAction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledAction({})", self)
    }
}

fn diagnostic(
    f: &mut fmt::Formatter<'_>,
    context_type: &ObjectType,
    expression: &str,
    compile_time: Duration,
) -> fmt::Result {
    write!(
        f,
        "Context type '{}' expression: '{}' compiled in {}ms",
        context_type,
        expression,
        compile_time.as_millis()
    )
}

/// A named condition with its ordered actions.
pub struct CompiledRule<C> {
    name: String,
    condition: CompiledCondition<C>,
    actions: Vec<CompiledAction<C>>,
}

impl<C: Context> CompiledRule<C> {
    pub(crate) fn new(
        name: String,
        condition: CompiledCondition<C>,
        actions: Vec<CompiledAction<C>>,
    ) -> Self {
        Self {
            name,
            condition,
            actions,
        }
    }

    /// Runs every action in order if the condition holds.
    ///
    /// Returns whether the rule fired. Actions do not re-check the condition,
    /// and the first failing action stops the remaining ones.
    pub fn evaluate_and_execute(&self, context: &mut C) -> EvalResult<bool> {
        if !self.condition.evaluate(context)? {
            trace!(rule = %self.name, context = context.context_name(), "condition not met");
            return Ok(false);
        }
        trace!(
            rule = %self.name,
            context = context.context_name(),
            actions = self.actions.len(),
            "condition met"
        );
        for action in &self.actions {
            action.execute(context)?;
        }
        Ok(true)
    }
}

impl<C> CompiledRule<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &CompiledCondition<C> {
        &self.condition
    }

    pub fn actions(&self) -> &[CompiledAction<C>] {
        &self.actions
    }
}

impl<C> Clone for CompiledRule<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            condition: self.condition.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<C> fmt::Debug for CompiledRule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("name", &self.name)
            .field("condition", &self.condition)
            .field("actions", &self.actions)
            .finish()
    }
}
