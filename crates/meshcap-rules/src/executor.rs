//! Rule execution.
//!
//! One execute call walks the compiled forest in order against a single
//! device snapshot and accumulates a capability configuration map. This is a
//! multi-match walk: every top-level rule is visited regardless of earlier
//! matches, so later rulesets can override or undo what earlier ones added.
//! Children are only visited under a matching parent.

use std::collections::BTreeMap;

use serde::Serialize;

use meshcap_core::DeviceSnapshot;

use crate::compiler::CompiledRule;
use crate::error::{Result, RuleError};
use crate::expr::Value;

/// The capability configuration produced by one execute call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Output {
    /// Capability name -> setting name -> evaluated value.
    pub capabilities: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Output {
    /// Whether the capability is present in the output.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Settings for a capability, if present.
    pub fn settings(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.capabilities.get(name)
    }
}

/// Evaluate the forest against one snapshot.
///
/// All-or-nothing: any evaluation error aborts the call and the partial
/// output is discarded.
pub fn execute(rules: &[CompiledRule], input: &DeviceSnapshot) -> Result<Output> {
    let mut output = Output::default();
    for rule in rules {
        apply_rule(rule, input, &mut output)?;
    }
    Ok(output)
}

fn apply_rule(rule: &CompiledRule, input: &DeviceSnapshot, output: &mut Output) -> Result<()> {
    let matched = match rule.filter.evaluate(input)? {
        Value::Bool(b) => b,
        _ => {
            return Err(RuleError::InvalidFilterResult {
                description: rule.description.clone(),
            })
        }
    };

    if !matched {
        // An unmatched rule prunes its entire subtree.
        return Ok(());
    }

    tracing::trace!(rule = %rule.description, "rule matched");

    // Remove before add: a capability named in both sections of the same
    // rule ends up added.
    for capability in rule.actions.remove.keys() {
        output.capabilities.remove(capability);
    }
    for (capability, settings) in &rule.actions.add {
        let mut values = BTreeMap::new();
        for (setting, expr) in settings {
            values.insert(setting.clone(), expr.evaluate(input)?);
        }
        output.capabilities.insert(capability.clone(), values);
    }

    for child in &rule.children {
        apply_rule(child, input, output)?;
    }
    Ok(())
}
