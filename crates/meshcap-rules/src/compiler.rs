//! Rule compilation.
//!
//! Turns the declarative [`Rule`](crate::model::Rule) trees of each ruleset
//! into executable [`CompiledRule`] trees, in dependency order, producing the
//! single flat forest the executor walks. Compilation is all-or-nothing: the
//! first failing expression aborts the whole pass and no partial forest is
//! produced.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ClauseError, Result, RuleError};
use crate::expr::{CompiledExpression, ConstExpr, ExpressionCompiler};
use crate::model::{Rule, RuleSet, SettingTemplate, SettingsMap};

/// Compiled capability settings: capability name -> setting name ->
/// evaluatable expression. An empty inner map means "capability present, no
/// configuration" and is preserved as such.
pub type CompiledSettings = BTreeMap<String, BTreeMap<String, Box<dyn CompiledExpression>>>;

/// Executable counterpart of [`crate::model::Actions`].
#[derive(Debug, Default)]
pub struct CompiledActions {
    pub add: CompiledSettings,
    pub remove: CompiledSettings,
}

/// Immutable, executable counterpart of a [`Rule`].
#[derive(Debug)]
pub struct CompiledRule {
    pub description: String,
    pub filter: Box<dyn CompiledExpression>,
    pub actions: CompiledActions,
    pub children: Vec<CompiledRule>,
}

/// Compile every ruleset in `order`, appending each ruleset's top-level
/// rules to one flat forest.
pub(crate) fn compile_rule_sets(
    order: &[String],
    rule_sets: &HashMap<String, RuleSet>,
    compiler: &dyn ExpressionCompiler,
) -> Result<Vec<CompiledRule>> {
    let mut forest = Vec::new();
    for name in order {
        let rs = &rule_sets[name];
        for rule in &rs.rules {
            let compiled = compile_rule(rule, compiler).map_err(|source| {
                RuleError::Compilation {
                    ruleset: name.clone(),
                    source,
                }
            })?;
            forest.push(compiled);
        }
        tracing::debug!(ruleset = %name, rules = rs.rules.len(), "compiled ruleset");
    }
    Ok(forest)
}

fn compile_rule(rule: &Rule, compiler: &dyn ExpressionCompiler) -> Result<CompiledRule, ClauseError> {
    let filter = compiler
        .compile_predicate(&rule.filter)
        .map_err(ClauseError::Filter)?;

    let actions = CompiledActions {
        add: compile_settings(&rule.actions.add, "add", compiler)?,
        remove: compile_settings(&rule.actions.remove, "remove", compiler)?,
    };

    let mut children = Vec::with_capacity(rule.children.len());
    for child in &rule.children {
        children.push(compile_rule(child, compiler)?);
    }

    Ok(CompiledRule {
        description: rule.description.clone(),
        filter,
        actions,
        children,
    })
}

fn compile_settings(
    settings: &SettingsMap,
    section: &'static str,
    compiler: &dyn ExpressionCompiler,
) -> Result<CompiledSettings, ClauseError> {
    let mut compiled = CompiledSettings::new();
    for (capability, entries) in settings {
        let mut values: BTreeMap<String, Box<dyn CompiledExpression>> = BTreeMap::new();
        for (setting, template) in entries {
            let expr = match template {
                SettingTemplate::Expression(source) => {
                    compiler.compile_value(source).map_err(|source| {
                        ClauseError::Action {
                            section,
                            capability: capability.clone(),
                            setting: setting.clone(),
                            source,
                        }
                    })?
                }
                SettingTemplate::Literal(value) => {
                    Box::new(ConstExpr(value.clone())) as Box<dyn CompiledExpression>
                }
            };
            values.insert(setting.clone(), expr);
        }
        compiled.insert(capability.clone(), values);
    }
    Ok(compiled)
}
