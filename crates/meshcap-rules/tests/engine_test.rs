//! End-to-end tests for the capability rule engine: loading, dependency
//! resolution, compilation, and execution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meshcap_core::{DeviceSnapshot, EndpointFacts, ProductFacts};
use meshcap_rules::{
    CompiledActions, CompiledExpression, CompiledRule, ConstExpr, Engine, ExprEvalError, Output,
    RuleError, Value,
};

fn light_snapshot() -> DeviceSnapshot {
    DeviceSnapshot::new(1).with_endpoint(
        1,
        EndpointFacts {
            profile: 0x0104,
            device_type: 0x0101,
            in_clusters: vec![0x0000, 0x0006, 0x0008],
            out_clusters: vec![],
        },
    )
}

#[test]
fn dependency_order_puts_dependencies_first() {
    let mut engine = Engine::new();
    engine
        .load_str(
            r#"{"name": "one", "depends_on": ["two"],
                "rules": [{"description": "from one", "filter": "true"}]}"#,
        )
        .unwrap();
    engine
        .load_str(r#"{"name": "two", "rules": [{"description": "from two", "filter": "true"}]}"#)
        .unwrap();
    engine.compile_rules().unwrap();

    let descriptions: Vec<&str> = engine
        .rules()
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["from two", "from one"]);
}

#[test]
fn missing_dependency_is_reported() {
    let mut engine = Engine::new();
    engine
        .load_str(r#"{"name": "one", "depends_on": ["two"]}"#)
        .unwrap();
    let err = engine.compile_rules().unwrap_err();
    assert!(err
        .to_string()
        .contains("ruleset missing dependency: one->two"));
}

#[test]
fn circular_dependency_is_reported_with_path() {
    let mut engine = Engine::new();
    engine
        .load_str(r#"{"name": "one", "depends_on": ["two"]}"#)
        .unwrap();
    engine
        .load_str(r#"{"name": "two", "depends_on": ["one"]}"#)
        .unwrap();
    let err = engine.compile_rules().unwrap_err();
    assert!(err
        .to_string()
        .contains("ruleset circular dependency: one->two->one"));
}

#[test]
fn filter_compile_failure_is_attributed() {
    let mut engine = Engine::new();
    engine
        .load_str(r#"{"name": "one", "rules": [{"filter": "INVALID UNPARSABLE FILTER"}]}"#)
        .unwrap();
    let err = engine.compile_rules().unwrap_err();
    assert!(err
        .to_string()
        .contains("ruleset compilation: one: filter compilation:"));
    // A failed compile leaves no partial forest behind.
    assert!(engine.rules().is_empty());
}

#[test]
fn multi_match_with_cascading_children() {
    let mut engine = Engine::new();
    engine
        .load_str(
            r#"
            {
                "name": "cascade",
                "rules": [
                    {
                        "description": "never matches",
                        "filter": "false",
                        "actions": { "add": { "one": {} } }
                    },
                    {
                        "description": "matches with settings",
                        "filter": "true",
                        "actions": { "add": { "two": { "Endpoint": "self" } } },
                        "rules": [
                            {
                                "description": "child",
                                "filter": "true",
                                "actions": { "add": { "three": {} } },
                                "rules": [
                                    {
                                        "description": "grandchild",
                                        "filter": "true",
                                        "actions": { "add": { "four": {} } }
                                    }
                                ]
                            }
                        ]
                    },
                    {
                        "description": "undoes three",
                        "filter": "true",
                        "actions": { "remove": { "three": {} } }
                    }
                ]
            }
            "#,
        )
        .unwrap();
    engine.compile_rules().unwrap();

    let output = engine.execute(&DeviceSnapshot::new(1)).unwrap();
    assert!(!output.has_capability("one"));
    assert!(output.has_capability("two"));
    assert_eq!(output.settings("two").unwrap()["Endpoint"], Value::Int(1));
    // Added by the child, removed again by the later sibling rule.
    assert!(!output.has_capability("three"));
    // The grandchild's effect survives: list order decides the final state.
    assert!(output.has_capability("four"));
}

/// A filter that counts how often it is evaluated.
#[derive(Debug)]
struct SpyFilter {
    result: bool,
    calls: Arc<AtomicUsize>,
}

impl CompiledExpression for SpyFilter {
    fn evaluate(&self, _: &DeviceSnapshot) -> Result<Value, ExprEvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Bool(self.result))
    }
}

#[test]
fn unmatched_parent_never_evaluates_children() {
    let child_calls = Arc::new(AtomicUsize::new(0));
    let child = CompiledRule {
        description: "child".to_string(),
        filter: Box::new(SpyFilter {
            result: true,
            calls: child_calls.clone(),
        }),
        actions: CompiledActions::default(),
        children: vec![],
    };
    let parent = CompiledRule {
        description: "parent".to_string(),
        filter: Box::new(ConstExpr(Value::Bool(false))),
        actions: CompiledActions::default(),
        children: vec![child],
    };

    let output = meshcap_rules::executor::execute(&[parent], &DeviceSnapshot::new(1)).unwrap();
    assert!(output.capabilities.is_empty());
    assert_eq!(child_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn compilation_is_deterministic() {
    let docs = [
        r#"{"name": "one", "depends_on": ["two"],
            "rules": [{"filter": "0x0006 in endpoint.in_clusters",
                       "actions": {"add": {"onoff": {"Endpoint": "self"}}}}]}"#,
        r#"{"name": "two", "rules": [{"filter": "true"}]}"#,
    ];

    let build = || {
        let mut engine = Engine::new();
        engine.load_collection(docs).unwrap();
        engine.compile_rules().unwrap();
        engine
    };

    let first = build();
    let second = build();
    assert_eq!(
        format!("{:?}", first.rules()),
        format!("{:?}", second.rules())
    );
}

#[test]
fn builtin_baseline_loads_and_compiles() {
    let mut engine = Engine::new();
    let names = engine.load_builtin().unwrap();
    assert!(names.contains(&"zcl-base".to_string()));
    assert!(!engine.rule_sets().is_empty());
    engine.compile_rules().unwrap();

    // A dimmable light picks up the nested refinements.
    let output = engine.execute(&light_snapshot()).unwrap();
    assert!(output.has_capability("onoff"));
    assert!(output.has_capability("level"));
    assert!(!output.has_capability("color"));
    assert_eq!(output.settings("level").unwrap()["Endpoint"], Value::Int(1));
}

#[test]
fn builtin_quirks_override_baseline() {
    let mut engine = Engine::new();
    engine.load_builtin().unwrap();
    engine.compile_rules().unwrap();

    // Magnet sensor: on/off server cluster, but a known contact sensor.
    let snapshot = DeviceSnapshot::new(1)
        .with_endpoint(
            1,
            EndpointFacts {
                in_clusters: vec![0x0000, 0x0006],
                ..Default::default()
            },
        )
        .with_product(
            1,
            ProductFacts {
                manufacturer: "LUMI".to_string(),
                name: "lumi.sensor_magnet".to_string(),
                version: String::new(),
            },
        );
    let output = engine.execute(&snapshot).unwrap();
    assert!(!output.has_capability("onoff"));
    assert!(output.has_capability("contact_sensor"));
    assert_eq!(
        output.settings("contact_sensor").unwrap()["Inverted"],
        Value::Bool(false)
    );
}

#[test]
fn execution_error_discards_output() {
    let mut engine = Engine::new();
    engine
        .load_str(
            r#"
            {
                "name": "strict",
                "rules": [
                    { "filter": "true", "actions": { "add": { "early": {} } } },
                    { "filter": "product.name == \"x\"" }
                ]
            }
            "#,
        )
        .unwrap();
    engine.compile_rules().unwrap();

    // No product facts loaded: the strict lookup fails and the whole call
    // errors, including the work done before the failing rule.
    let result = engine.execute(&DeviceSnapshot::new(1));
    assert!(matches!(result, Err(RuleError::Execution { .. })));
}

#[test]
fn compiled_engine_is_shareable_across_threads() {
    let mut engine = Engine::new();
    engine.load_builtin().unwrap();
    engine.compile_rules().unwrap();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || -> Output {
                let mut last = Output::default();
                for _ in 0..50 {
                    last = engine.execute(&light_snapshot()).unwrap();
                }
                last
            })
        })
        .collect();

    let outputs: Vec<Output> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for output in &outputs {
        assert_eq!(output, &outputs[0]);
        assert!(output.has_capability("onoff"));
    }
}
