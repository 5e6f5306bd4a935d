//! Error types for the rules crate.

use crate::expr::{ExprCompileError, ExprEvalError};

// Re-export the core error type
pub use meshcap_core::Error as CoreError;

/// Errors raised while loading, compiling, or executing rule definitions.
///
/// The dependency and compilation variants render the ruleset name into the
/// message so a definition author can attribute the failure to a single
/// document and clause.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A rule document could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A ruleset names a dependency that was never loaded.
    #[error("ruleset missing dependency: {dependent}->{missing}")]
    MissingDependency { dependent: String, missing: String },

    /// The dependency graph contains a cycle; `path` is the full cycle,
    /// e.g. `one->two->one`.
    #[error("ruleset circular dependency: {path}")]
    CircularDependency { path: String },

    /// An expression inside a ruleset failed to compile.
    #[error("ruleset compilation: {ruleset}: {source}")]
    Compilation {
        ruleset: String,
        source: ClauseError,
    },

    /// An expression failed to evaluate against the device snapshot.
    #[error("rule execution: {source}")]
    Execution {
        #[from]
        source: ExprEvalError,
    },

    /// A filter expression evaluated to a non-boolean value.
    #[error("rule '{description}': filter did not evaluate to a boolean")]
    InvalidFilterResult { description: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which clause of a rule failed to compile.
#[derive(Debug, thiserror::Error)]
pub enum ClauseError {
    #[error("filter compilation: {0}")]
    Filter(ExprCompileError),

    #[error("action compilation: {section} {capability}.{setting}: {source}")]
    Action {
        section: &'static str,
        capability: String,
        setting: String,
        source: ExprCompileError,
    },
}

/// Result type for rule operations.
pub type Result<T, E = RuleError> = std::result::Result<T, E>;

// Convert RuleError to the platform error at crate boundaries.
impl From<RuleError> for CoreError {
    fn from(e: RuleError) -> Self {
        match e {
            RuleError::Parse(s) => CoreError::Parse {
                location: "rules".to_string(),
                message: s,
            },
            RuleError::MissingDependency { .. } | RuleError::CircularDependency { .. } => {
                CoreError::Validation(e.to_string())
            }
            RuleError::Compilation { .. } => CoreError::Internal(e.to_string()),
            RuleError::Execution { .. } | RuleError::InvalidFilterResult { .. } => {
                CoreError::Internal(e.to_string())
            }
            RuleError::Io(e) => CoreError::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_messages() {
        let err = RuleError::MissingDependency {
            dependent: "one".to_string(),
            missing: "two".to_string(),
        };
        assert_eq!(err.to_string(), "ruleset missing dependency: one->two");

        let err = RuleError::CircularDependency {
            path: "one->two->one".to_string(),
        };
        assert_eq!(err.to_string(), "ruleset circular dependency: one->two->one");
    }

    #[test]
    fn test_compilation_error_carries_ruleset_and_clause() {
        let err = RuleError::Compilation {
            ruleset: "one".to_string(),
            source: ClauseError::Filter(ExprCompileError::UnknownIdentifier(
                "bogus".to_string(),
            )),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("ruleset compilation: one: filter compilation:"));
        assert!(msg.contains("bogus"));
    }

    #[test]
    fn test_core_error_conversion() {
        let core: CoreError = RuleError::Parse("bad json".to_string()).into();
        assert!(matches!(core, CoreError::Parse { .. }));

        let core: CoreError = RuleError::MissingDependency {
            dependent: "a".to_string(),
            missing: "b".to_string(),
        }
        .into();
        assert!(matches!(core, CoreError::Validation(_)));
    }
}
