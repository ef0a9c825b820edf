use std::time::Instant;

use tracing::{info, instrument};

use crate::ast::Rule;
use crate::config::CompilerConfig;
use crate::eval::{CompiledAction, CompiledRule};
use crate::types::Context;

use super::error::{CompileError, CompileResult};
use super::expression::ExpressionCompiler;

/// Turns a rule into a [`CompiledRule`]: one condition plus every action,
/// or nothing at all.
#[derive(Clone)]
pub struct RuleCompiler {
    expressions: ExpressionCompiler,
}

impl RuleCompiler {
    pub fn new(expressions: ExpressionCompiler) -> Self {
        Self { expressions }
    }

    pub fn expressions(&self) -> &ExpressionCompiler {
        &self.expressions
    }

    pub fn config(&self) -> &CompilerConfig {
        self.expressions.config()
    }

    #[instrument(level = "debug", skip_all, fields(rule = ?rule.name))]
    pub fn compile_rule<C: Context>(&self, rule: &Rule) -> CompileResult<CompiledRule<C>> {
        let started = Instant::now();
        let name = rule
            .name
            .clone()
            .unwrap_or_else(|| self.config().default_rule_name.clone());
        let condition = rule
            .condition
            .as_ref()
            .ok_or_else(|| CompileError::structural("Rule must have a 'condition' property"))?;
        let actions = rule
            .actions
            .as_ref()
            .ok_or_else(|| CompileError::structural("Rule must have an 'actions' array property"))?;

        let condition = self.expressions.compile_condition::<C>(condition)?;
        let actions = actions
            .iter()
            .map(|action| self.expressions.compile_action::<C>(action))
            .collect::<CompileResult<Vec<CompiledAction<C>>>>()?;

        info!(
            rule = %name,
            context = %condition.context_type(),
            actions = actions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Compiled rule"
        );
        Ok(CompiledRule::new(name, condition, actions))
    }

    /// Decodes the wire JSON and compiles it.
    pub fn compile_rule_json<C: Context>(&self, json: &str) -> CompileResult<CompiledRule<C>> {
        let rule = Rule::from_json(json)?;
        self.compile_rule(&rule)
    }
}
