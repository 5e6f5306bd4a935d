//! Capability rule resolution engine for meshcap.
//!
//! Maps a per-device fact snapshot (endpoints, clusters, product identity)
//! to a capability configuration diff through declarative, dependency-ordered
//! rulesets of expression-driven rules.
//!
//! ## Example
//!
//! ```rust
//! use meshcap_core::{DeviceSnapshot, EndpointFacts};
//! use meshcap_rules::Engine;
//!
//! fn main() -> Result<(), meshcap_rules::RuleError> {
//!     let mut engine = Engine::new();
//!     engine.load_builtin()?;
//!     engine.compile_rules()?;
//!
//!     let snapshot = DeviceSnapshot::new(1).with_endpoint(
//!         1,
//!         EndpointFacts {
//!             in_clusters: vec![0x0006, 0x0008],
//!             ..Default::default()
//!         },
//!     );
//!     let output = engine.execute(&snapshot)?;
//!     assert!(output.has_capability("onoff"));
//!     Ok(())
//! }
//! ```
//!
//! The engine is synchronous and pure: loading and compilation happen once,
//! after which the compiled forest is immutable and an `Arc<Engine>` can be
//! shared across any number of concurrent `execute` calls.

pub mod compiler;
pub mod engine;
pub mod error;
pub mod executor;
pub mod expr;
pub mod model;

mod resolver;

pub use compiler::{CompiledActions, CompiledRule, CompiledSettings};
pub use engine::{Engine, BUILTIN_DEFINITIONS};
pub use error::{ClauseError, Result, RuleError};
pub use executor::Output;
pub use expr::{
    CompiledExpression, ConstExpr, ExprCompileError, ExprEvalError, ExprLanguage,
    ExpressionCompiler, Type, Value,
};
pub use model::{Actions, Rule, RuleSet, SettingTemplate, SettingsMap};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
