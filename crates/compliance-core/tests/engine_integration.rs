// compliance-core/tests/engine_integration.rs
// ============================================================================
// Test: End-to-end pipeline
// Description: Resource Reader -> Engine dispatch, covering spec.md §8's
// concrete end-to-end scenarios that do not require a concrete builtin.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]
#![allow(clippy::expect_used, reason = "Tests use expect for explicit failure messages.")]

use base64::Engine as _;
use compliance_core::BuiltinEntry;
use compliance_core::Engine;
use compliance_core::Registry;
use compliance_core::ResourceReader;
use compliance_core::Status;
use compliance_core::testing::MockContext;

/// An empty registry: these scenarios exercise combinator folding and engine
/// dispatch, not any particular builtin.
struct EmptyRegistry;

impl Registry for EmptyRegistry {
    fn find(&self, _name: &str) -> Option<&BuiltinEntry> {
        None
    }
}

fn base64_encode(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value)
}

fn read_one(mof: &str) -> compliance_core::Resource {
    let mut reader = ResourceReader::new(mof);
    reader.next().expect("one resource block").expect("parses")
}

#[test]
fn all_of_empty_procedure_is_compliant() {
    let doc = base64_encode(r#"{"audit":{"allOf":[]}}"#);
    let mof = format!(
        "instance of OsConfigResource as $Resource\n\
         {{\n\
         RuleName = \"X\";\n\
         ProcedureObjectValue = \"{doc}\";\n\
         }};\n"
    );
    let resource = read_one(&mof);

    let registry = EmptyRegistry;
    let mut engine = Engine::new(&registry, true);
    let context = MockContext::new();
    let payload = serde_json::to_vec(&resource.procedure).expect("serializes");
    engine
        .mmi_set(&format!("procedure{}", resource.rule_name), &payload, &context)
        .expect("procedure stores");

    let (status, indicator) = engine
        .mmi_get(&format!("audit{}", resource.rule_name), &context)
        .expect("audit runs");
    assert_eq!(status, Status::Compliant);
    assert_eq!(indicator.label, "X");
    assert!(indicator.children.is_empty());
}

#[test]
fn any_of_empty_procedure_is_non_compliant() {
    let doc = base64_encode(r#"{"audit":{"anyOf":[]}}"#);
    let mof = format!(
        "instance of OsConfigResource as $Resource\n\
         {{\n\
         RuleName = \"Y\";\n\
         ProcedureObjectValue = \"{doc}\";\n\
         }};\n"
    );
    let resource = read_one(&mof);

    let registry = EmptyRegistry;
    let mut engine = Engine::new(&registry, true);
    let context = MockContext::new();
    let payload = serde_json::to_vec(&resource.procedure).expect("serializes");
    engine
        .mmi_set(&format!("procedure{}", resource.rule_name), &payload, &context)
        .expect("procedure stores");

    let (status, _indicator) = engine
        .mmi_get(&format!("audit{}", resource.rule_name), &context)
        .expect("audit runs");
    assert_eq!(status, Status::NonCompliant);
}

#[test]
fn unknown_builtin_is_an_error_at_compile_time() {
    let doc = base64_encode(r#"{"audit":{"FunctionThatDoesNotExist":{}}}"#);
    let mof = format!(
        "instance of OsConfigResource as $Resource\n\
         {{\n\
         RuleName = \"Z\";\n\
         ProcedureObjectValue = \"{doc}\";\n\
         }};\n"
    );
    let resource = read_one(&mof);

    let registry = EmptyRegistry;
    let mut engine = Engine::new(&registry, true);
    let context = MockContext::new();
    let payload = serde_json::to_vec(&resource.procedure).expect("serializes");
    let err = engine
        .mmi_set(&format!("procedure{}", resource.rule_name), &payload, &context)
        .expect_err("unknown builtin rejected at compile time");
    assert_eq!(err.to_string(), "Unknown function FunctionThatDoesNotExist");
}

#[test]
fn unknown_parameter_overlay_is_rejected() {
    let doc = base64_encode(r#"{"audit":{"allOf":[]},"parameters":{"K":"v"}}"#);
    let mof = format!(
        "instance of OsConfigResource as $Resource\n\
         {{\n\
         RuleName = \"W\";\n\
         ProcedureObjectValue = \"{doc}\";\n\
         }};\n"
    );
    let resource = read_one(&mof);

    let registry = EmptyRegistry;
    let mut engine = Engine::new(&registry, true);
    let context = MockContext::new();
    let payload = serde_json::to_vec(&resource.procedure).expect("serializes");
    engine
        .mmi_set(&format!("procedure{}", resource.rule_name), &payload, &context)
        .expect("procedure stores");

    let err = engine
        .mmi_set(&format!("init{}", resource.rule_name), b"Q=1", &context)
        .expect_err("unknown overlay key rejected");
    assert_eq!(err.to_string(), "User parameter 'Q' not found");
}

#[test]
fn payload_key_round_trips_through_resource_reader() {
    let doc = base64_encode(r#"{"audit":{"allOf":[]},"parameters":{"K":"v"}}"#);
    let payload = base64_encode("K=1");
    let mof = format!(
        "instance of OsConfigResource as $Resource\n\
         {{\n\
         RuleName = \"V\";\n\
         ProcedureObjectValue = \"{doc}\";\n\
         PayloadKey = \"{payload}\";\n\
         BenchmarkSection = \"1.2.3\";\n\
         }};\n"
    );
    let resource = read_one(&mof);
    assert!(resource.has_init_audit);
    assert_eq!(resource.payload.as_deref(), Some("K=1"));
    assert_eq!(resource.benchmark_section, "1.2.3");
}
