//! Expression Compiler.
//!
//! One recursive pass lowers an untyped [`Expression`] into a [`TypedExpr`]: a
//! tree of closures over an evaluation [`Frame`](crate::eval::Frame), the static type of the value
//! it produces, and a rendering used in diagnostics. Member paths are resolved
//! against the [`TypeCatalog`] at compile time, so evaluation only follows
//! pre-built projections.

use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::ast::{
    ArrayLiteralExpression, BinaryExpression, BinaryOperator, CallExpression, Expression,
    LiteralExpression, UnaryExpression, UnaryOperator,
};
use crate::config::CompilerConfig;
use crate::eval::evaluator::node;
use crate::eval::{CompiledAction, CompiledCondition, Eval, EvalResult};
use crate::types::registry::{Getter, Projection, ProjectionMut};
use crate::types::{
    Arguments, BaseLink, Context, Invoker, MemberAccessor, ObjectType, TypeCatalog, TypeRef,
    Value,
};

use super::error::{CompileError, CompileResult, ExpressionRole};
use super::literal::LiteralCompiler;
use super::operators::as_bool;
use super::resolver::{MethodResolutionOptions, MethodResolver, ResolvedMethod};

/// A lowered expression node.
#[derive(Clone)]
pub struct TypedExpr {
    pub ty: TypeRef,
    pub eval: Eval,
    pub rendering: String,
    /// First context-mutating method the tree calls, if any.
    pub mutating: Option<String>,
}

impl std::fmt::Debug for TypedExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedExpr")
            .field("ty", &self.ty)
            .field("rendering", &self.rendering)
            .field("mutating", &self.mutating)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Hop {
    get: Projection,
    get_mut: ProjectionMut,
}

impl From<&BaseLink> for Hop {
    fn from(link: &BaseLink) -> Self {
        Hop {
            get: link.get.clone(),
            get_mut: link.get_mut.clone(),
        }
    }
}

fn project<'a>(hops: &[Hop], mut target: &'a dyn Any) -> EvalResult<&'a dyn Any> {
    for hop in hops {
        target = (hop.get)(target)?;
    }
    Ok(target)
}

fn project_mut<'a>(hops: &[Hop], mut target: &'a mut dyn Any) -> EvalResult<&'a mut dyn Any> {
    for hop in hops {
        target = (hop.get_mut)(target)?;
    }
    Ok(target)
}

/// A dotted path resolved from the context.
///
/// `hops` walk object members (and base links) in order; `value` reads the
/// final member when it is value-typed.
struct MemberPath {
    hops: Vec<Hop>,
    value: Option<Getter>,
    ty: TypeRef,
    rendering: String,
}

impl MemberPath {
    fn context(context_type: &ObjectType) -> Self {
        Self {
            hops: Vec::new(),
            value: None,
            ty: TypeRef::Object(context_type.clone()),
            rendering: "ctx".to_string(),
        }
    }
}

fn constant(value: Value, ty: TypeRef) -> TypedExpr {
    TypedExpr {
        rendering: value.to_string(),
        ty,
        mutating: None,
        eval: node(move |_| Ok(value.clone())),
    }
}

fn render_arguments(leading: Option<&str>, arguments: &[Value]) -> String {
    leading
        .map(str::to_string)
        .into_iter()
        .chain(arguments.iter().map(ToString::to_string))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compiles conditions and actions for the context type named by its
/// [`MethodResolutionOptions`].
#[derive(Clone)]
pub struct ExpressionCompiler {
    catalog: Arc<dyn TypeCatalog>,
    options: MethodResolutionOptions,
    literals: LiteralCompiler,
    resolver: MethodResolver,
    config: CompilerConfig,
}

impl ExpressionCompiler {
    pub fn new(catalog: Arc<dyn TypeCatalog>, options: MethodResolutionOptions) -> Self {
        Self {
            resolver: MethodResolver::new(catalog.clone()),
            catalog,
            options,
            literals: LiteralCompiler::new(),
            config: CompilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_literal_compiler(mut self, literals: LiteralCompiler) -> Self {
        self.literals = literals;
        self
    }

    pub fn options(&self) -> &MethodResolutionOptions {
        &self.options
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[instrument(level = "debug", skip_all, fields(context = %self.options.context_type()))]
    pub fn compile_condition<C: Context>(
        &self,
        expression: &Expression,
    ) -> CompileResult<CompiledCondition<C>> {
        self.ensure_context::<C>()?;
        let started = Instant::now();
        let typed = self.build_expression(expression)?;
        if typed.ty != TypeRef::Bool {
            return Err(CompileError::invalid_root(
                ExpressionRole::Condition,
                TypeRef::Bool,
                typed.ty,
            ));
        }
        if let Some(method) = typed.mutating {
            return Err(CompileError::MutationInCondition { method });
        }
        let rendering = format!("ctx => {}", typed.rendering);
        let elapsed = started.elapsed();
        self.report(ExpressionRole::Condition, &rendering, elapsed);
        Ok(CompiledCondition::new(rendering, elapsed, typed.eval))
    }

    #[instrument(level = "debug", skip_all, fields(context = %self.options.context_type()))]
    pub fn compile_action<C: Context>(
        &self,
        expression: &Expression,
    ) -> CompileResult<CompiledAction<C>> {
        self.ensure_context::<C>()?;
        let started = Instant::now();
        let typed = self.build_expression(expression)?;
        if typed.ty != TypeRef::Void {
            return Err(CompileError::invalid_root(
                ExpressionRole::Action,
                TypeRef::Void,
                typed.ty,
            ));
        }
        let rendering = format!("ctx => {}", typed.rendering);
        let elapsed = started.elapsed();
        self.report(ExpressionRole::Action, &rendering, elapsed);
        Ok(CompiledAction::new(rendering, elapsed, typed.eval))
    }

    /// Lowers `expression` without any requirement on its root type.
    pub fn build_expression(&self, expression: &Expression) -> CompileResult<TypedExpr> {
        self.build(expression, 0)
    }

    fn ensure_context<C: Context>(&self) -> CompileResult<()> {
        let requested = ObjectType::of::<C>();
        if requested != *self.options.context_type() {
            return Err(CompileError::Configuration {
                requested: requested.name().to_string(),
                configured: self.options.context_type().name().to_string(),
            });
        }
        Ok(())
    }

    fn report(&self, role: ExpressionRole, rendering: &str, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        if elapsed > self.config.slow_compile_threshold {
            warn!(%role, expression = rendering, elapsed_ms, "slow expression compile");
        } else {
            debug!(%role, expression = rendering, elapsed_ms, "compiled expression");
        }
    }

    fn build(&self, expression: &Expression, depth: usize) -> CompileResult<TypedExpr> {
        if depth > self.config.max_expression_depth {
            return Err(CompileError::NestingTooDeep {
                limit: self.config.max_expression_depth,
            });
        }
        match expression {
            Expression::Binary(binary) => self.build_binary(binary, depth),
            Expression::Unary(unary) => self.build_unary(unary, depth),
            Expression::Call(call) => self.build_call(call),
            Expression::MemberAccess(member) => self.build_member_access(&member.path),
            Expression::ArrayLiteral(array) => self.build_array(array),
            Expression::BasicLiteral(literal) => self.build_literal(literal),
        }
    }

    fn build_binary(&self, binary: &BinaryExpression, depth: usize) -> CompileResult<TypedExpr> {
        let operator = BinaryOperator::from_str(&binary.operator).map_err(|_| {
            CompileError::UnsupportedOperator {
                arity: "binary",
                operator: binary.operator.clone(),
            }
        })?;
        let left = self.build(&binary.left, depth + 1)?;
        let right = self.build(&binary.right, depth + 1)?;
        if left.ty != right.ty {
            return Err(CompileError::type_mismatch(operator, left.ty, right.ty));
        }
        let ty = operator.result_type(&left.ty)?;

        let rendering = format!(
            "({} {} {})",
            left.rendering,
            operator.symbol(),
            right.rendering
        );
        let mutating = left.mutating.or(right.mutating);
        let (lhs, rhs) = (left.eval, right.eval);
        let eval = match operator {
            BinaryOperator::AndAlso => node(move |frame| {
                if as_bool(&lhs(frame)?)? {
                    rhs(frame)
                } else {
                    Ok(Value::Bool(false))
                }
            }),
            BinaryOperator::OrElse => node(move |frame| {
                if as_bool(&lhs(frame)?)? {
                    Ok(Value::Bool(true))
                } else {
                    rhs(frame)
                }
            }),
            _ => node(move |frame| {
                let left = lhs(frame)?;
                let right = rhs(frame)?;
                operator.apply(left, right)
            }),
        };

        Ok(TypedExpr {
            ty,
            eval,
            rendering,
            mutating,
        })
    }

    fn build_unary(&self, unary: &UnaryExpression, depth: usize) -> CompileResult<TypedExpr> {
        let operator = UnaryOperator::from_str(&unary.operator).map_err(|_| {
            CompileError::UnsupportedOperator {
                arity: "unary",
                operator: unary.operator.clone(),
            }
        })?;
        let operand = self.build(&unary.operand, depth + 1)?;
        let ty = operator.result_type(&operand.ty)?;
        let inner = operand.eval;
        Ok(TypedExpr {
            ty,
            eval: node(move |frame| operator.apply(inner(frame)?)),
            rendering: format!("{}({})", operator, operand.rendering),
            mutating: operand.mutating,
        })
    }

    /// Walks `path` segment by segment from the context type.
    fn resolve_path(&self, path: &str) -> CompileResult<MemberPath> {
        let mut resolved = MemberPath::context(self.options.context_type());
        for segment in path.split('.') {
            let owner = match &resolved.ty {
                TypeRef::Object(owner) => owner.clone(),
                other => return Err(CompileError::member_access(segment, other)),
            };
            let lookup = self
                .catalog
                .find_member(&owner, segment)
                .ok_or_else(|| CompileError::member_access(segment, &owner))?;

            resolved.hops.extend(lookup.via.iter().map(Hop::from));
            match &lookup.item.accessor {
                MemberAccessor::Object { get, get_mut } => resolved.hops.push(Hop {
                    get: get.clone(),
                    get_mut: get_mut.clone(),
                }),
                MemberAccessor::Value(getter) => resolved.value = Some(getter.clone()),
            }
            resolved.ty = lookup.item.ty.clone();
            resolved.rendering.push('.');
            resolved.rendering.push_str(segment);
        }
        Ok(resolved)
    }

    fn build_member_access(&self, path: &str) -> CompileResult<TypedExpr> {
        let member = self.resolve_path(path)?;
        let Some(getter) = member.value else {
            return Err(CompileError::ObjectValue {
                path: path.to_string(),
                ty: member.ty,
            });
        };
        let hops = member.hops;
        Ok(TypedExpr {
            ty: member.ty,
            eval: node(move |frame| getter(project(&hops, frame.shared())?)),
            rendering: member.rendering,
            mutating: None,
        })
    }

    fn build_call(&self, call: &CallExpression) -> CompileResult<TypedExpr> {
        let name = call.method.name.clone();
        let (arguments, argument_types): (Vec<Value>, Vec<TypeRef>) = self
            .literals
            .parse_argument_list(call)?
            .into_iter()
            .unzip();
        let receiver = match &call.method.receiver {
            Some(path) => self.resolve_path(path)?,
            None => MemberPath::context(self.options.context_type()),
        };
        let ResolvedMethod {
            method,
            declaring_type,
            via,
            is_extension,
        } = self
            .resolver
            .resolve(&name, &receiver.ty, &argument_types, &self.options)?;

        let ty = method.return_type.clone();
        let mutating = method.is_mutating().then(|| name.clone());
        let rendering = match (&method.invoker, is_extension) {
            (_, true) => format!(
                "{}({})",
                name,
                render_arguments(Some(&receiver.rendering), &arguments)
            ),
            (Invoker::Static(_), false) => format!(
                "{}.{}({})",
                declaring_type,
                name,
                render_arguments(None, &arguments)
            ),
            (_, false) => format!(
                "{}.{}({})",
                receiver.rendering,
                name,
                render_arguments(None, &arguments)
            ),
        };

        debug!(method = %name, %rendering, extension = is_extension, "bound call");

        let mut hops = receiver.hops;
        hops.extend(via.iter().map(Hop::from));

        let eval = match method.invoker.clone() {
            Invoker::Static(invoke) if is_extension => {
                // the receiver value becomes the leading argument
                let Some(getter) = receiver.value else {
                    return Err(CompileError::resolution(&name, &argument_types));
                };
                node(move |frame| {
                    let mut values = Vec::with_capacity(arguments.len() + 1);
                    values.push(getter(project(&hops, frame.shared())?)?);
                    values.extend(arguments.iter().cloned());
                    invoke(Arguments::new(&name, &values))
                })
            }
            Invoker::Static(invoke) => node(move |_| invoke(Arguments::new(&name, &arguments))),
            Invoker::Shared(_) | Invoker::Exclusive(_) if receiver.value.is_some() => {
                return Err(CompileError::resolution(&name, &argument_types));
            }
            Invoker::Shared(invoke) => node(move |frame| {
                let target = project(&hops, frame.shared())?;
                invoke(target, Arguments::new(&name, &arguments))
            }),
            Invoker::Exclusive(invoke) => node(move |frame| {
                let target = project_mut(&hops, frame.exclusive(&name)?)?;
                invoke(target, Arguments::new(&name, &arguments))
            }),
        };

        Ok(TypedExpr {
            ty,
            eval,
            rendering,
            mutating,
        })
    }

    fn build_array(&self, array: &ArrayLiteralExpression) -> CompileResult<TypedExpr> {
        let (value, element) = self.literals.parse_array_literal(array)?;
        Ok(constant(value, TypeRef::array(element)))
    }

    fn build_literal(&self, literal: &LiteralExpression) -> CompileResult<TypedExpr> {
        let (value, ty) = self.literals.parse_literal(literal)?;
        Ok(constant(value, ty))
    }
}
