//! The capability rule engine.
//!
//! An [`Engine`] goes through two phases. During loading, rule documents are
//! ingested into a table of rulesets keyed by declared name. A single call
//! to [`Engine::compile_rules`] then resolves ruleset dependencies and
//! compiles every rule tree into one flat, ordered forest. From that point
//! the engine is read-only: [`Engine::execute`] takes `&self` and one
//! compiled engine is meant to be shared (behind an `Arc`) across
//! concurrent per-device evaluations.
//!
//! Reloading a compiled engine is not supported; build a fresh `Engine` and
//! swap the shared handle instead.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use meshcap_core::DeviceSnapshot;

use crate::compiler::{self, CompiledRule};
use crate::error::{Result, RuleError};
use crate::executor::{self, Output};
use crate::expr::{ExprLanguage, ExpressionCompiler};
use crate::model::RuleSet;
use crate::resolver;

/// Built-in baseline rule documents, shipped with the engine. They cover the
/// standard cluster-to-capability mapping and known product quirks, and are
/// expected to always load and compile cleanly.
pub const BUILTIN_DEFINITIONS: &[&str] = &[
    include_str!("definitions/zcl-base.json"),
    include_str!("definitions/product-quirks.json"),
];

/// Declarative capability resolution engine.
pub struct Engine {
    rule_sets: HashMap<String, RuleSet>,
    load_order: Vec<String>,
    rules: Vec<CompiledRule>,
    compiler: Arc<dyn ExpressionCompiler>,
}

impl Engine {
    /// Create an engine using the built-in expression language.
    pub fn new() -> Self {
        Self::with_compiler(Arc::new(ExprLanguage))
    }

    /// Create an engine with an injected expression compiler.
    pub fn with_compiler(compiler: Arc<dyn ExpressionCompiler>) -> Self {
        Self {
            rule_sets: HashMap::new(),
            load_order: Vec::new(),
            rules: Vec::new(),
            compiler,
        }
    }

    /// Load one rule document, returning the ruleset name it declares.
    ///
    /// Loading a name that is already present replaces the earlier
    /// definition (last-loaded-wins).
    pub fn load_str(&mut self, document: &str) -> Result<String> {
        let rule_set: RuleSet =
            serde_json::from_str(document).map_err(|e| RuleError::Parse(e.to_string()))?;
        if rule_set.name.is_empty() {
            return Err(RuleError::Parse("ruleset name must not be empty".to_string()));
        }

        let name = rule_set.name.clone();
        if self.rule_sets.insert(name.clone(), rule_set).is_some() {
            tracing::warn!(ruleset = %name, "replacing previously loaded ruleset");
        } else {
            self.load_order.push(name.clone());
        }
        tracing::debug!(ruleset = %name, "loaded ruleset");
        Ok(name)
    }

    /// Load one rule document from a reader.
    pub fn load_reader(&mut self, mut reader: impl Read) -> Result<String> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        self.load_str(&document)
    }

    /// Load a collection of rule documents, returning the declared names in
    /// load order.
    pub fn load_collection<I, S>(&mut self, documents: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Vec::new();
        for document in documents {
            names.push(self.load_str(document.as_ref())?);
        }
        Ok(names)
    }

    /// Load the built-in baseline documents.
    pub fn load_builtin(&mut self) -> Result<Vec<String>> {
        self.load_collection(BUILTIN_DEFINITIONS.iter().copied())
    }

    /// Resolve ruleset dependencies and compile every rule tree into the
    /// flat execution forest.
    ///
    /// Fails on missing or circular dependencies and on any expression that
    /// does not compile; no partial forest is produced. The result depends
    /// only on the dependency graph and document order, so repeated
    /// compilation of the same documents is deterministic.
    pub fn compile_rules(&mut self) -> Result<()> {
        let order = resolver::resolve_order(&self.rule_sets, &self.load_order)?;
        self.rules = compiler::compile_rule_sets(&order, &self.rule_sets, self.compiler.as_ref())?;
        tracing::info!(
            rule_sets = order.len(),
            rules = self.rules.len(),
            "compiled rule forest"
        );
        Ok(())
    }

    /// Evaluate the compiled forest against one device snapshot.
    pub fn execute(&self, input: &DeviceSnapshot) -> Result<Output> {
        executor::execute(&self.rules, input)
    }

    /// The loaded ruleset table.
    pub fn rule_sets(&self) -> &HashMap<String, RuleSet> {
        &self.rule_sets
    }

    /// The compiled top-level rules, empty before [`Engine::compile_rules`].
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
