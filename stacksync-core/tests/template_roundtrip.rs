//! Roundtrip and equivalence tests for the template model.
//!
//! Each case is isolated — no shared state.

use rstest::rstest;
use serde_json::json;
use stacksync_core::template;
use stacksync_core::types::{Resource, ResourceKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn function_template_json() -> String {
    r#"{
        "Resources": {
            "Function": {
                "Type": "AWS::Serverless::Function",
                "Properties": {"CodeUri": "local/", "Handler": "app.handler"},
                "Metadata": {"BuildMethod": "makefile"}
            },
            "Queue": {"Type": "AWS::SQS::Queue", "Properties": {"QueueName": "jobs"}}
        }
    }"#
    .to_owned()
}

fn function_template_yaml() -> String {
    "
Resources:
  Function:
    Type: AWS::Serverless::Function
    Properties:
      CodeUri: local/
      Handler: app.handler
    Metadata:
      BuildMethod: makefile
  Queue:
    Type: AWS::SQS::Queue
    Properties:
      QueueName: jobs
"
    .to_owned()
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

#[test]
fn json_and_yaml_bodies_parse_to_the_same_template() {
    let from_json = template::parse_str(&function_template_json(), "json").expect("json");
    let from_yaml = template::parse_str(&function_template_yaml(), "yaml").expect("yaml");
    assert_eq!(from_json, from_yaml);
}

#[test]
fn serialize_and_reparse_preserves_equality() {
    let parsed = template::parse_str(&function_template_json(), "json").expect("parse");
    let body = serde_json::to_string(&json!({ "Resources": parsed })).expect("serialize");
    let reparsed = template::parse_str(&body, "reserialized").expect("reparse");
    assert_eq!(parsed, reparsed);
}

#[rstest]
#[case("AWS::Serverless::Function")]
#[case("AWS::Lambda::LayerVersion")]
#[case("AWS::CloudFormation::Stack")]
#[case("Custom::Widget")]
fn kind_survives_serde(#[case] type_name: &str) {
    let resource = Resource::new(ResourceKind::from(type_name));
    let value = serde_json::to_value(&resource).expect("serialize");
    assert_eq!(value["Type"], json!(type_name));
    let back: Resource = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back.kind, ResourceKind::from(type_name));
}

#[test]
fn unknown_resource_kinds_compare_verbatim() {
    let a = template::parse_str(&function_template_json(), "a").expect("a");
    let mut b = a.clone();
    assert_eq!(a, b);
    b.get_mut("Queue")
        .expect("queue")
        .properties
        .insert("QueueName".to_owned(), json!("other"));
    assert_ne!(a, b);
}
